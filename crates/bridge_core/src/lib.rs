//! Keeps a lighting console's running shows in step with a video mixer's
//! program scene.
//!
//! Two independently reconnecting websocket clients feed one engine: the
//! lighting connection maintains the [`WidgetRegistry`] and carries outbound
//! commands, the mixer connection turns scene switches into
//! [`plan_scene_switch`] decisions executed through the [`LightingHandle`].

use std::sync::Arc;

use shared::{
    domain::{Widget, WidgetId},
    protocol::LightingCommand,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod backoff;
pub mod error;
pub mod lighting;
pub mod mixer;
pub mod reconcile;
pub mod registry;
pub mod scene_map;
pub mod widget_page;

pub use backoff::{Backoff, ReconnectPolicy};
pub use error::{BridgeError, MappingError};
pub use lighting::{LightingConnection, LightingHandle};
pub use mixer::MixerConnection;
pub use reconcile::{plan_scene_switch, ScenePlan, SceneSwitcher, StartAction, SwitchOutcome};
pub use registry::{SharedRegistry, WidgetRegistry};
pub use scene_map::SceneMap;
pub use widget_page::{parse_widget_page, HttpWidgetSource, WidgetSource};

pub const DEFAULT_MIXER_URL: &str = "ws://127.0.0.1:4444";
pub const DEFAULT_LIGHTING_URL: &str = "ws://127.0.0.1:9999/qlcplusWS";
pub const DEFAULT_LIGHTING_STATUS_URL: &str = "http://127.0.0.1:9999";

const EVENT_CAPACITY: usize = 256;

/// Lifecycle of one managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    /// Socket open but the initial state fetch has not completed.
    OpenUnready,
    Ready,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    LightingReady {
        widgets: usize,
    },
    LightingDisconnected,
    MixerConnected,
    MixerDisconnected,
    WidgetUpdated {
        widget_id: WidgetId,
        active: bool,
        monitoring: bool,
    },
    SceneApplied {
        scene: String,
        commands: Vec<LightingCommand>,
    },
    SceneDropped {
        scene: String,
    },
}

pub(crate) enum SessionEnd {
    Closed,
    Shutdown,
}

pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mixer_url: String,
    pub lighting_url: String,
    pub lighting_status_url: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mixer_url: DEFAULT_MIXER_URL.into(),
            lighting_url: DEFAULT_LIGHTING_URL.into(),
            lighting_status_url: DEFAULT_LIGHTING_STATUS_URL.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

pub struct Bridge {
    config: BridgeConfig,
    scenes: SceneMap,
    widget_source: Option<Arc<dyn WidgetSource>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig, scenes: SceneMap) -> Self {
        Self {
            config,
            scenes,
            widget_source: None,
        }
    }

    /// Replaces the default HTTP status page scraper.
    pub fn with_widget_source(mut self, source: Arc<dyn WidgetSource>) -> Self {
        self.widget_source = Some(source);
        self
    }

    /// Starts both connection tasks on the current tokio runtime.
    pub fn spawn(self) -> BridgeHandle {
        let Bridge {
            config,
            scenes,
            widget_source,
        } = self;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let registry = WidgetRegistry::shared();
        let source: Arc<dyn WidgetSource> = match widget_source {
            Some(source) => source,
            None => Arc::new(HttpWidgetSource::new(config.lighting_status_url.clone())),
        };

        let (lighting, lighting_handle) = LightingConnection::new(
            config.lighting_url,
            source,
            Arc::clone(&registry),
            config.reconnect,
            events.clone(),
        );
        let switcher = SceneSwitcher::new(
            Arc::new(scenes),
            Arc::clone(&registry),
            lighting_handle.clone(),
            events.clone(),
        );
        let (mixer, mixer_state) =
            MixerConnection::new(config.mixer_url, config.reconnect, switcher, events.clone());

        let tasks = vec![
            tokio::spawn(lighting.run(shutdown_rx.clone())),
            tokio::spawn(mixer.run(shutdown_rx)),
        ];

        BridgeHandle {
            shutdown,
            tasks,
            registry,
            lighting: lighting_handle,
            mixer_state,
            events,
        }
    }
}

pub struct BridgeHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    registry: SharedRegistry,
    lighting: LightingHandle,
    mixer_state: watch::Receiver<LinkState>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeHandle {
    pub fn subscribe_events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn lighting(&self) -> &LightingHandle {
        &self.lighting
    }

    pub fn lighting_state(&self) -> LinkState {
        self.lighting.state()
    }

    pub fn mixer_state(&self) -> LinkState {
        *self.mixer_state.borrow()
    }

    pub async fn widgets(&self) -> Vec<Widget> {
        self.registry.read().await.snapshot()
    }

    /// Cancels pending reconnects, closes both sockets and waits for the tasks to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "bridge: connection task failed");
            }
        }
        info!("bridge: stopped");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
