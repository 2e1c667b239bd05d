//! Inbound Events
//!
//! Everything that can happen to the controller arrives through one queue of
//! [`InboundEvent`]s: host activity (tasks, debug sessions, commands),
//! messages from the panel, and settings changes.
//!
//! # Wire Format
//!
//! Host events are JSON objects tagged by `kind`, one per line when read from
//! a stream:
//!
//! ```text
//! {"kind":"task_started","execution":"build-1","name":"build"}
//! {"kind":"debug_session_started","session":"s1","name":"Launch","parent":null}
//! {"kind":"command","command":"toggle"}
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SettingKey;
use crate::messages::SurfaceEvent;

/// Name used in start reasons when a task has none
pub const UNTITLED_TASK: &str = "Untitled task";

/// Name used in end messages when a task has none
pub const UNNAMED_TASK: &str = "Task";

/// User-invoked commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Flip the manual context
    Toggle,
    /// Stop everything
    Stop,
    /// Run the demo sequence
    Demo,
}

/// Activity reported by the host environment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// A task started
    TaskStarted {
        /// Identity of this execution of the task
        execution: String,
        /// Task name
        #[serde(default)]
        name: Option<String>,
    },

    /// The process behind a task started
    TaskProcessStarted {
        /// Identity of this execution of the task
        execution: String,
        /// Task name
        #[serde(default)]
        name: Option<String>,
    },

    /// A task ended
    TaskEnded {
        /// Identity of this execution of the task
        execution: String,
        /// Task name
        #[serde(default)]
        name: Option<String>,
    },

    /// The process behind a task ended
    TaskProcessEnded {
        /// Identity of this execution of the task
        execution: String,
        /// Task name
        #[serde(default)]
        name: Option<String>,
    },

    /// A debug session started
    DebugSessionStarted {
        /// Session identity
        session: String,
        /// Session name
        name: String,
        /// Parent session, for nested sessions
        #[serde(default)]
        parent: Option<String>,
    },

    /// A debug session terminated
    DebugSessionTerminated {
        /// Session identity
        session: String,
        /// Session name
        name: String,
    },

    /// A command was invoked
    Command {
        /// Which command
        command: Command,
    },
}

impl HostEvent {
    /// Short name of the event kind (for logging)
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskStarted { .. } => "task_started",
            Self::TaskProcessStarted { .. } => "task_process_started",
            Self::TaskEnded { .. } => "task_ended",
            Self::TaskProcessEnded { .. } => "task_process_ended",
            Self::DebugSessionStarted { .. } => "debug_session_started",
            Self::DebugSessionTerminated { .. } => "debug_session_terminated",
            Self::Command { .. } => "command",
        }
    }

    /// Parse one JSON line
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid host event.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Everything the dispatcher consumes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// Host activity
    Host(HostEvent),
    /// Message from the panel
    Surface(SurfaceEvent),
    /// These settings changed
    SettingsChanged(Vec<SettingKey>),
}

impl From<HostEvent> for InboundEvent {
    fn from(event: HostEvent) -> Self {
        Self::Host(event)
    }
}

impl From<SurfaceEvent> for InboundEvent {
    fn from(event: SurfaceEvent) -> Self {
        Self::Surface(event)
    }
}

impl From<Command> for InboundEvent {
    fn from(command: Command) -> Self {
        Self::Host(HostEvent::Command { command })
    }
}
