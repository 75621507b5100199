use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use shared::domain::WidgetId;

use crate::error::MappingError;

/// Scene name to widget id, loaded once at startup and never mutated.
///
/// Several scenes may share a widget. Iteration is ordered by scene name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SceneMap {
    scenes: BTreeMap<String, WidgetId>,
}

impl SceneMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| MappingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn widget_for(&self, scene_name: &str) -> Option<&WidgetId> {
        self.scenes.get(scene_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WidgetId)> {
        self.scenes
            .iter()
            .map(|(scene, widget_id)| (scene.as_str(), widget_id))
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl<S, W> FromIterator<(S, W)> for SceneMap
where
    S: Into<String>,
    W: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (S, W)>>(iter: T) -> Self {
        Self {
            scenes: iter
                .into_iter()
                .map(|(scene, widget_id)| (scene.into(), WidgetId::new(widget_id)))
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "tests/scene_map_tests.rs"]
mod tests;
