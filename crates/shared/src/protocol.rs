use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{WidgetId, WidgetStatus},
    error::ProtocolError,
};

/// Tag carried by lighting console status pushes for show buttons.
pub const BUTTON_TAG: &str = "BUTTON";
/// Mixer update kind announcing that the program scene changed.
pub const SWITCH_SCENES_UPDATE: &str = "SwitchScenes";

const FIELD_SEPARATOR: char = '|';

/// Outbound value that presses a show button.
pub const PRESS_VALUE: u8 = 255;
/// Outbound value that releases a show button.
pub const RELEASE_VALUE: u8 = 0;

/// A single fire-and-forget frame sent to the lighting console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingCommand {
    pub widget_id: WidgetId,
    pub value: u8,
}

impl LightingCommand {
    pub fn new(widget_id: WidgetId, value: u8) -> Self {
        Self { widget_id, value }
    }

    /// Press then release: the console toggles the show's running state.
    pub fn pulse(widget_id: &WidgetId) -> [Self; 2] {
        [
            Self::new(widget_id.clone(), PRESS_VALUE),
            Self::new(widget_id.clone(), RELEASE_VALUE),
        ]
    }

    pub fn to_frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LightingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_SEPARATOR}{}", self.widget_id, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPush {
    pub widget_id: WidgetId,
    pub status: WidgetStatus,
}

/// Inbound frame from the lighting console socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightingFrame {
    ButtonStatus(StatusPush),
    /// Anything that is not a button status push; carried for logging only.
    Other(String),
}

impl LightingFrame {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut fields = raw.split(FIELD_SEPARATOR);
        let widget_id = fields.next().unwrap_or_default();
        if fields.next() != Some(BUTTON_TAG) {
            return Ok(Self::Other(raw.to_string()));
        }
        if widget_id.is_empty() {
            return Err(ProtocolError::MalformedLightingFrame(raw.to_string()));
        }
        let Some(value) = fields.next() else {
            return Err(ProtocolError::MalformedLightingFrame(raw.to_string()));
        };
        // Anything that is not an integer reads as neither running nor armed.
        let status = value
            .trim()
            .parse::<i64>()
            .map_or(WidgetStatus::Idle, WidgetStatus::from_value);

        Ok(Self::ButtonStatus(StatusPush {
            widget_id: WidgetId::new(widget_id),
            status,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct MixerFrame {
    #[serde(rename = "update-type")]
    update_type: Option<String>,
    #[serde(rename = "scene-name")]
    scene_name: Option<String>,
}

/// Inbound JSON frame from the mixer event socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerEvent {
    SceneSwitched { scene_name: String },
    /// Responses and every other update kind; the bridge never acts on these.
    Other { update_type: Option<String> },
}

impl MixerEvent {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let frame: MixerFrame = serde_json::from_str(raw)?;
        match frame.update_type.as_deref() {
            Some(SWITCH_SCENES_UPDATE) => {
                let scene_name = frame.scene_name.ok_or(ProtocolError::MissingSceneName)?;
                Ok(Self::SceneSwitched { scene_name })
            }
            _ => Ok(Self::Other {
                update_type: frame.update_type,
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
