use std::sync::Arc;

use shared::{
    domain::{Widget, WidgetId},
    protocol::{LightingCommand, MixerEvent},
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    lighting::LightingHandle,
    registry::{SharedRegistry, WidgetRegistry},
    scene_map::SceneMap,
    BridgeEvent,
};

/// What the start phase decided for the new scene's show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartAction {
    /// The scene has no mapping; lighting is left alone.
    Unmapped,
    /// The scene maps to a widget the console does not expose.
    UnknownWidget(WidgetId),
    AlreadyRunning(Widget),
    Activate(Widget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePlan {
    pub scene: String,
    pub stopped: Vec<Widget>,
    pub start: StartAction,
    /// Every frame to send, stop phase first.
    pub commands: Vec<LightingCommand>,
}

/// Decides which shows to stop and start when the mixer switches to `scene`.
pub fn plan_scene_switch(scene: &str, scenes: &SceneMap, registry: &WidgetRegistry) -> ScenePlan {
    let Some(target) = scenes.widget_for(scene) else {
        return ScenePlan {
            scene: scene.to_string(),
            stopped: Vec::new(),
            start: StartAction::Unmapped,
            commands: Vec::new(),
        };
    };

    let mut stopped: Vec<Widget> = Vec::new();
    let mut commands = Vec::new();

    for (_, widget_id) in scenes.iter() {
        if widget_id == target || stopped.iter().any(|widget| &widget.id == widget_id) {
            continue;
        }
        let Some(widget) = registry.get(widget_id) else {
            continue;
        };
        if widget.active {
            commands.extend(LightingCommand::pulse(widget_id));
            stopped.push(widget.clone());
        }
    }

    let start = match registry.get(target) {
        None => StartAction::UnknownWidget(target.clone()),
        Some(widget) if widget.active => StartAction::AlreadyRunning(widget.clone()),
        Some(widget) => {
            commands.extend(LightingCommand::pulse(target));
            StartAction::Activate(widget.clone())
        }
    };

    ScenePlan {
        scene: scene.to_string(),
        stopped,
        start,
        commands,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied(ScenePlan),
    /// The lighting console was not ready; nothing was sent.
    Dropped,
}

/// Reacts to mixer scene switches by driving the lighting console.
#[derive(Clone)]
pub struct SceneSwitcher {
    scenes: Arc<SceneMap>,
    registry: SharedRegistry,
    lighting: LightingHandle,
    events: broadcast::Sender<BridgeEvent>,
}

impl SceneSwitcher {
    pub fn new(
        scenes: Arc<SceneMap>,
        registry: SharedRegistry,
        lighting: LightingHandle,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Self {
        Self {
            scenes,
            registry,
            lighting,
            events,
        }
    }

    /// Handles one raw mixer frame. Returns `None` for frames that are not scene switches.
    pub async fn handle_frame(&self, raw: &str) -> Option<SwitchOutcome> {
        match MixerEvent::parse(raw) {
            Ok(MixerEvent::SceneSwitched { scene_name }) => Some(self.switch_to(&scene_name).await),
            Ok(MixerEvent::Other { update_type }) => {
                debug!(?update_type, "mixer: ignoring update");
                None
            }
            Err(err) => {
                debug!(%err, "mixer: dropped malformed frame");
                None
            }
        }
    }

    pub async fn switch_to(&self, scene: &str) -> SwitchOutcome {
        info!(scene, "scene: switched");
        if !self.lighting.is_ready() {
            info!(scene, "scene: lighting console not ready, dropping switch");
            let _ = self.events.send(BridgeEvent::SceneDropped {
                scene: scene.to_string(),
            });
            return SwitchOutcome::Dropped;
        }

        let plan = {
            let registry = self.registry.read().await;
            plan_scene_switch(scene, &self.scenes, &registry)
        };

        for widget in &plan.stopped {
            info!(scene, widget_id = %widget.id, "scene: {} was active, disabled", widget.text);
        }
        match &plan.start {
            StartAction::Unmapped => debug!(scene, "scene: no light show mapped"),
            StartAction::UnknownWidget(widget_id) => {
                info!(scene, %widget_id, "scene: mapped show not exposed by console")
            }
            StartAction::AlreadyRunning(widget) => {
                info!(scene, widget_id = %widget.id, "scene: show {} was already running", widget.text)
            }
            StartAction::Activate(widget) => {
                info!(scene, widget_id = %widget.id, "scene: using light show {}", widget.text)
            }
        }

        // Stop at the first refusal; the console dropped mid-switch.
        let queued = plan
            .commands
            .iter()
            .take_while(|command| self.lighting.send((*command).clone()))
            .count();
        if queued < plan.commands.len() {
            info!(
                scene,
                queued,
                planned = plan.commands.len(),
                "scene: lighting console went away mid-switch, dropping switch"
            );
            let _ = self.events.send(BridgeEvent::SceneDropped {
                scene: scene.to_string(),
            });
            return SwitchOutcome::Dropped;
        }

        let _ = self.events.send(BridgeEvent::SceneApplied {
            scene: plan.scene.clone(),
            commands: plan.commands.clone(),
        });
        SwitchOutcome::Applied(plan)
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
