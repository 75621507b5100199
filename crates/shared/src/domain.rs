use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(WidgetId);

/// Console value meaning the show is running.
pub const ACTIVE_VALUE: i64 = 255;
/// Console value meaning the show is armed but not running.
pub const MONITORING_VALUE: i64 = 127;

/// Tri-state status reported by the lighting console for a show button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetStatus {
    Active,
    Monitoring,
    Idle,
}

impl WidgetStatus {
    pub fn from_value(value: i64) -> Self {
        match value {
            ACTIVE_VALUE => Self::Active,
            MONITORING_VALUE => Self::Monitoring,
            _ => Self::Idle,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_monitoring(self) -> bool {
        matches!(self, Self::Monitoring)
    }
}

/// One show button exposed by the lighting console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub text: String,
    pub active: bool,
    pub monitoring: bool,
}

impl Widget {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: WidgetId::new(id),
            text: text.into(),
            active: false,
            monitoring: false,
        }
    }

    pub fn with_status(mut self, status: WidgetStatus) -> Self {
        self.apply_status(status);
        self
    }

    pub fn apply_status(&mut self, status: WidgetStatus) {
        self.active = status.is_active();
        self.monitoring = status.is_monitoring();
    }
}
