use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{Widget, WidgetId},
    protocol::StatusPush,
};
use tokio::sync::RwLock;

pub type SharedRegistry = Arc<RwLock<WidgetRegistry>>;

/// Current view of the lighting console's show buttons, keyed by widget id.
#[derive(Debug, Default, Clone)]
pub struct WidgetRegistry {
    widgets: HashMap<WidgetId, Widget>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Drops every widget from the previous session and installs `widgets`.
    /// Returns the number of distinct widgets now known.
    pub fn replace_all(&mut self, widgets: impl IntoIterator<Item = Widget>) -> usize {
        self.widgets = widgets
            .into_iter()
            .map(|widget| (widget.id.clone(), widget))
            .collect();
        self.widgets.len()
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
    }

    /// Applies a console status push. Unknown ids are ignored and yield `None`.
    pub fn apply_status(&mut self, push: &StatusPush) -> Option<&Widget> {
        let widget = self.widgets.get_mut(&push.widget_id)?;
        widget.apply_status(push.status);
        Some(widget)
    }

    pub fn get(&self, widget_id: &WidgetId) -> Option<&Widget> {
        self.widgets.get(widget_id)
    }

    pub fn is_active(&self, widget_id: &WidgetId) -> bool {
        self.get(widget_id).is_some_and(|widget| widget.active)
    }

    pub fn contains(&self, widget_id: &WidgetId) -> bool {
        self.widgets.contains_key(widget_id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Widgets sorted by id.
    pub fn snapshot(&self) -> Vec<Widget> {
        let mut widgets: Vec<Widget> = self.widgets.values().cloned().collect();
        widgets.sort_by(|a, b| a.id.cmp(&b.id));
        widgets
    }
}

impl FromIterator<Widget> for WidgetRegistry {
    fn from_iter<T: IntoIterator<Item = Widget>>(iter: T) -> Self {
        let mut registry = Self::new();
        registry.replace_all(iter);
        registry
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
