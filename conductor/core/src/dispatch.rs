//! Event Dispatch
//!
//! Host events are reduced to [`Effect`]s by a pure [`EventTracker`] and then
//! applied to the controller by the [`Dispatcher`]:
//!
//! ```text
//! InboundEvent ──► Dispatcher ──► EventTracker::reduce ──► Vec<Effect>
//!                      │                                        │
//!                      └────────── apply ◄──────────────────────┘
//!                                    │
//!                                    ▼
//!                           ActivityController
//! ```
//!
//! The tracker remembers which context belongs to which task execution or
//! debug session. A task and its process report start and end separately;
//! both map to the same execution, so each execution begins at most one
//! context and ends it at most once.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConfigSnapshot;
use crate::context::{ContextId, STOPPED_BY_USER};
use crate::controller::{ActivityController, StartOptions};
use crate::events::{Command, HostEvent, InboundEvent, UNNAMED_TASK, UNTITLED_TASK};

/// A change to apply to the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Begin a context with a known ID
    Begin {
        /// Context ID
        id: ContextId,
        /// Displayed reason
        reason: String,
        /// Reveal behaviour
        options: StartOptions,
    },
    /// End a context
    End {
        /// Context ID
        id: ContextId,
        /// Completion message
        message: String,
    },
    /// Clear every context
    StopAll {
        /// Displayed reason
        reason: String,
    },
    /// Flip the manual context
    Toggle,
    /// Run the demo sequence
    PlayDemo,
}

/// Maps host activity to contexts
#[derive(Debug, Default)]
pub struct EventTracker {
    tasks: HashMap<String, ContextId>,
    sessions: HashMap<String, ContextId>,
}

impl EventTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce one host event to the effects it causes
    ///
    /// Tracking toggles in `snapshot` are consulted when something starts;
    /// ends are always honoured for contexts that were begun.
    pub fn reduce(&mut self, event: &HostEvent, snapshot: &ConfigSnapshot) -> Vec<Effect> {
        match event {
            HostEvent::TaskStarted { execution, name }
            | HostEvent::TaskProcessStarted { execution, name } => {
                if !snapshot.track_tasks || self.tasks.contains_key(execution) {
                    return Vec::new();
                }
                let id = ContextId::generate();
                self.tasks.insert(execution.clone(), id.clone());
                vec![Effect::Begin {
                    id,
                    reason: format!("Task: {}", name.as_deref().unwrap_or(UNTITLED_TASK)),
                    options: StartOptions::auto_reveal(),
                }]
            }

            HostEvent::TaskEnded { execution, name }
            | HostEvent::TaskProcessEnded { execution, name } => self
                .tasks
                .remove(execution)
                .map(|id| Effect::End {
                    id,
                    message: format!(
                        "Task finished: {}",
                        name.as_deref().unwrap_or(UNNAMED_TASK)
                    ),
                })
                .into_iter()
                .collect(),

            HostEvent::DebugSessionStarted {
                session,
                name,
                parent,
            } => {
                if parent.is_some()
                    || !snapshot.track_debug_sessions
                    || self.sessions.contains_key(session)
                {
                    return Vec::new();
                }
                let id = ContextId::generate();
                self.sessions.insert(session.clone(), id.clone());
                vec![Effect::Begin {
                    id,
                    reason: format!("Debugging: {name}"),
                    options: StartOptions::auto_reveal(),
                }]
            }

            HostEvent::DebugSessionTerminated { session, name } => self
                .sessions
                .remove(session)
                .map(|id| Effect::End {
                    id,
                    message: format!("Debug session complete: {name}"),
                })
                .into_iter()
                .collect(),

            HostEvent::Command { command } => vec![match command {
                Command::Toggle => Effect::Toggle,
                Command::Stop => Effect::StopAll {
                    reason: STOPPED_BY_USER.to_string(),
                },
                Command::Demo => Effect::PlayDemo,
            }],
        }
    }

    /// Number of tracked task executions
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of tracked debug sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Applies inbound events to a controller
#[derive(Debug)]
pub struct Dispatcher {
    tracker: EventTracker,
    controller: ActivityController,
    demos: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a dispatcher for `controller`
    #[must_use]
    pub fn new(controller: ActivityController) -> Self {
        Self {
            tracker: EventTracker::new(),
            controller,
            demos: Vec::new(),
        }
    }

    /// Handle one inbound event
    pub fn dispatch(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Host(event) => {
                let snapshot = self.controller.settings_snapshot();
                let effects = self.tracker.reduce(&event, &snapshot);
                tracing::debug!(kind = event.kind(), effects = effects.len(), "Host event");
                for effect in effects {
                    self.apply(effect);
                }
            }
            InboundEvent::Surface(event) => {
                tracing::debug!(event = ?event, "Surface event");
                self.controller.handle_surface_event(event);
            }
            InboundEvent::SettingsChanged(keys) => {
                self.controller.reconfigure(&keys);
            }
        }
    }

    /// Drain `rx` until every sender is gone
    ///
    /// Demo runs still in flight are cancelled on return, which ends their
    /// contexts.
    pub async fn run(mut self, mut rx: mpsc::Receiver<InboundEvent>) {
        tracing::info!("Dispatcher started");
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        for demo in self.demos.drain(..) {
            demo.abort();
        }
        tracing::info!("Dispatcher stopped, inbound queue closed");
    }

    /// The tracker state
    #[must_use]
    pub fn tracker(&self) -> &EventTracker {
        &self.tracker
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Begin {
                id,
                reason,
                options,
            } => {
                self.controller.begin_context(&reason, options, Some(id));
            }
            Effect::End { id, message } => {
                self.controller.end_context(&id, Some(&message));
            }
            Effect::StopAll { reason } => self.controller.stop_all(Some(&reason)),
            Effect::Toggle => self.controller.toggle(),
            Effect::PlayDemo => {
                self.demos.retain(|demo| !demo.is_finished());
                let controller = self.controller.clone();
                self.demos.push(tokio::spawn(async move {
                    controller.play_demo().await;
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedSettings;
    use crate::context::DEMO_REASON;
    use crate::indicator::MemoryStatusSink;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn task(kind: &str, execution: &str, name: Option<&str>) -> HostEvent {
        let execution = execution.to_string();
        let name = name.map(str::to_string);
        match kind {
            "start" => HostEvent::TaskStarted { execution, name },
            "process_start" => HostEvent::TaskProcessStarted { execution, name },
            "end" => HostEvent::TaskEnded { execution, name },
            _ => HostEvent::TaskProcessEnded { execution, name },
        }
    }

    fn debug_start(session: &str, parent: Option<&str>) -> HostEvent {
        HostEvent::DebugSessionStarted {
            session: session.into(),
            name: "Launch".into(),
            parent: parent.map(str::to_string),
        }
    }

    #[test]
    fn test_task_and_process_start_begin_once() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot::default();

        let first = tracker.reduce(&task("start", "e1", Some("build")), &snapshot);
        let second = tracker.reduce(&task("process_start", "e1", Some("build")), &snapshot);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert!(matches!(
            &first[0],
            Effect::Begin { reason, options, .. }
                if reason == "Task: build" && *options == StartOptions::auto_reveal()
        ));
    }

    #[test]
    fn test_task_and_process_end_apply_once() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot::default();
        let begun = tracker.reduce(&task("process_start", "e1", Some("build")), &snapshot);
        let Effect::Begin { id: begun_id, .. } = &begun[0] else {
            panic!("expected begin");
        };

        let first = tracker.reduce(&task("end", "e1", Some("build")), &snapshot);
        let second = tracker.reduce(&task("process_end", "e1", Some("build")), &snapshot);
        assert_eq!(
            first,
            vec![Effect::End {
                id: begun_id.clone(),
                message: "Task finished: build".into(),
            }]
        );
        assert!(second.is_empty());
        assert_eq!(tracker.task_count(), 0);
    }

    #[test]
    fn test_unnamed_task_fallbacks() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot::default();
        let begun = tracker.reduce(&task("start", "e1", None), &snapshot);
        let ended = tracker.reduce(&task("end", "e1", None), &snapshot);
        assert!(matches!(
            &begun[0],
            Effect::Begin { reason, .. } if reason == "Task: Untitled task"
        ));
        assert!(matches!(
            &ended[0],
            Effect::End { message, .. } if message == "Task finished: Task"
        ));
    }

    #[test]
    fn test_tracking_disabled_ignores_starts() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot {
            track_tasks: false,
            track_debug_sessions: false,
            ..ConfigSnapshot::default()
        };
        assert!(tracker.reduce(&task("start", "e1", None), &snapshot).is_empty());
        assert!(tracker.reduce(&debug_start("s1", None), &snapshot).is_empty());
        assert!(tracker.reduce(&task("end", "e1", None), &snapshot).is_empty());
    }

    #[test]
    fn test_end_honoured_after_tracking_disabled() {
        let mut tracker = EventTracker::new();
        tracker.reduce(&task("start", "e1", None), &ConfigSnapshot::default());
        let disabled = ConfigSnapshot {
            track_tasks: false,
            ..ConfigSnapshot::default()
        };
        assert_eq!(tracker.reduce(&task("end", "e1", None), &disabled).len(), 1);
    }

    #[test]
    fn test_nested_debug_sessions_ignored() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot::default();
        assert_eq!(tracker.reduce(&debug_start("s1", None), &snapshot).len(), 1);
        assert!(tracker.reduce(&debug_start("s2", Some("s1")), &snapshot).is_empty());
        assert_eq!(tracker.session_count(), 1);

        let child_end = HostEvent::DebugSessionTerminated {
            session: "s2".into(),
            name: "Child".into(),
        };
        assert!(tracker.reduce(&child_end, &snapshot).is_empty());

        let end = HostEvent::DebugSessionTerminated {
            session: "s1".into(),
            name: "Launch".into(),
        };
        let effects = tracker.reduce(&end, &snapshot);
        assert!(matches!(
            &effects[0],
            Effect::End { message, .. } if message == "Debug session complete: Launch"
        ));
    }

    #[test]
    fn test_commands() {
        let mut tracker = EventTracker::new();
        let snapshot = ConfigSnapshot::default();
        let reduce = |tracker: &mut EventTracker, command| {
            tracker.reduce(&HostEvent::Command { command }, &snapshot)
        };
        assert_eq!(reduce(&mut tracker, Command::Toggle), vec![Effect::Toggle]);
        assert_eq!(reduce(&mut tracker, Command::Demo), vec![Effect::PlayDemo]);
        assert_eq!(
            reduce(&mut tracker, Command::Stop),
            vec![Effect::StopAll {
                reason: STOPPED_BY_USER.into()
            }]
        );
    }

    fn dispatcher() -> (Dispatcher, ActivityController) {
        let controller = ActivityController::new(
            Arc::new(SharedSettings::default()),
            Arc::new(MemoryStatusSink::new()),
        );
        (Dispatcher::new(controller.clone()), controller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_drives_controller() {
        let (mut dispatcher, controller) = dispatcher();

        dispatcher.dispatch(task("start", "e1", Some("build")).into());
        dispatcher.dispatch(task("process_start", "e1", Some("build")).into());
        assert_eq!(controller.context_count(), 1);
        assert_eq!(controller.displayed_reason(), "Task: build");

        dispatcher.dispatch(task("process_end", "e1", Some("build")).into());
        dispatcher.dispatch(task("end", "e1", Some("build")).into());
        assert!(!controller.is_running());
        assert_eq!(controller.displayed_reason(), "Task finished: build");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_command_clears_everything() {
        let (mut dispatcher, controller) = dispatcher();
        dispatcher.dispatch(Command::Toggle.into());
        dispatcher.dispatch(debug_start("s1", None).into());
        dispatcher.dispatch(Command::Stop.into());
        assert_eq!(controller.context_count(), 0);
        assert_eq!(controller.displayed_reason(), STOPPED_BY_USER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drains_queue_and_cancels_demo() {
        let (dispatcher, controller) = dispatcher();
        let (tx, rx) = mpsc::channel(16);
        let runner = tokio::spawn(dispatcher.run(rx));

        tx.send(Command::Demo.into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.displayed_reason(), DEMO_REASON);

        drop(tx);
        runner.await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!controller.is_running());
    }
}
