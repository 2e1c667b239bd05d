//! Panel Wire Protocol
//!
//! Messages exchanged between the controller and the panel surface. The
//! panel runs in an isolated context and is reachable only through these
//! JSON-shaped `{type, payload}` messages.
//!
//! ```text
//! Controller ── PanelMessage (start / stop / config / status) ──► Panel
//! Controller ◄──────── SurfaceEvent (ready / toggle) ──────────── Panel
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{AnimationSpeed, ConfigSnapshot};

/// Motion-related subset of the settings, as seen by the panel
///
/// Fields are optional so the panel can merge partial updates into its
/// last applied configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotionConfig {
    /// Animation speed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_speed: Option<AnimationSpeed>,
    /// Configured reduced motion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduced_motion: Option<bool>,
}

impl From<&ConfigSnapshot> for MotionConfig {
    fn from(snapshot: &ConfigSnapshot) -> Self {
        Self {
            animation_speed: Some(snapshot.animation_speed),
            reduced_motion: Some(snapshot.reduced_motion),
        }
    }
}

/// Messages from the controller to the panel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PanelMessage {
    /// Begin the panel animation
    Start {
        /// Displayed reason
        reason: String,
        /// Motion settings at start time
        config: MotionConfig,
    },

    /// Halt the panel animation
    Stop,

    /// Settings changed
    Config(MotionConfig),

    /// Replace the status line
    Status(String),
}

impl PanelMessage {
    /// Short name of the message kind (for logging)
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::Config(_) => "config",
            Self::Status(_) => "status",
        }
    }

    /// Serialize to the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid panel message.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Messages from the panel to the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SurfaceEvent {
    /// The panel finished loading and can receive messages
    Ready,
    /// The user clicked the panel's toggle button
    Toggle,
}

impl SurfaceEvent {
    /// Parse from the JSON wire format
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid surface event.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
