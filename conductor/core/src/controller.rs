//! Activity Controller
//!
//! Aggregates any number of overlapping contexts into one running/idle state
//! and drives both outputs: the status indicator directly, the panel through
//! the [`PanelProvider`].
//!
//! # Architecture
//!
//! ```text
//!  begin_context ─┐                       ┌──► StatusIndicator (frames / engaged)
//!  end_context  ──┼──► ContextSet ──► start/stop
//!  stop_all     ──┘    (ordered)          └──► PanelProvider ──► PanelSurface
//! ```
//!
//! The controller is a cheap, cloneable handle. Each operation takes the lock,
//! runs to completion and releases it; no lock is ever held across an await.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{ConfigSnapshot, SettingKey, Settings};
use crate::context::{
    ContextId, ContextSet, COMPLETION_FALLBACK, DEACTIVATED, DEMO_COMPLETE, DEMO_REASON,
    MANUAL_REASON, MANUAL_STOP, WORKING_FALLBACK,
};
use crate::indicator::{StatusIndicator, StatusSink};
use crate::messages::SurfaceEvent;
use crate::provider::{PanelProvider, PanelSurface, PostOutcome, ReadyReport};

/// How long the demo context stays active
pub const DEMO_DURATION: Duration = Duration::from_secs(6);

/// Reveal behaviour when a context begins
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Reveal if the auto-reveal setting allows it
    pub auto_reveal: bool,
    /// Reveal regardless of settings
    pub force_reveal: bool,
}

impl StartOptions {
    /// Reveal subject to the auto-reveal setting
    #[must_use]
    pub fn auto_reveal() -> Self {
        Self {
            auto_reveal: true,
            force_reveal: false,
        }
    }

    /// Always reveal
    #[must_use]
    pub fn force_reveal() -> Self {
        Self {
            auto_reveal: false,
            force_reveal: true,
        }
    }

    fn should_reveal(self, snapshot: &ConfigSnapshot) -> bool {
        self.force_reveal || (self.auto_reveal && snapshot.auto_reveal_on_task)
    }
}

/// Options for [`ActivityController::with_progress`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressOptions {
    /// Context reason (defaults to "Working…")
    pub title: Option<String>,
    /// Reveal subject to the auto-reveal setting
    pub auto_reveal: bool,
    /// Message shown if this is the last context to end
    pub completion_message: Option<String>,
}

impl ProgressOptions {
    /// Options with a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Set auto-reveal
    #[must_use]
    pub fn with_auto_reveal(mut self, auto_reveal: bool) -> Self {
        self.auto_reveal = auto_reveal;
        self
    }

    /// Set the completion message
    #[must_use]
    pub fn with_completion_message(mut self, message: impl Into<String>) -> Self {
        self.completion_message = Some(message.into());
        self
    }
}

/// Point-in-time view of the panel provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderSnapshot {
    /// A surface is attached
    pub has_surface: bool,
    /// The surface signalled ready
    pub ready: bool,
    /// Messages waiting for readiness
    pub pending: usize,
    /// Deferred reveal, if any
    pub pending_reveal: Option<bool>,
}

struct ControllerState {
    settings: Arc<dyn Settings>,
    indicator: StatusIndicator,
    provider: PanelProvider,
    contexts: ContextSet,
    manual: Option<ContextId>,
    running: bool,
    displayed_reason: String,
    disposed: bool,
}

impl ControllerState {
    fn start(&mut self, reason: &str, options: StartOptions) {
        let snapshot = self.settings.snapshot();

        if !self.running {
            self.running = true;
            tracing::info!(reason, "Activity started");
            let outcome = self.provider.start(reason, &snapshot);
            log_post("start", &outcome);
            if snapshot.enable_status_bar {
                self.indicator.set_visible(true);
            }
            if snapshot.effective_reduced_motion() {
                self.indicator.show_engaged();
            } else {
                self.indicator.begin_animation(snapshot.animation_speed);
            }
        }

        self.displayed_reason = reason.to_string();
        let outcome = self.provider.set_status(reason);
        log_post("status", &outcome);
        if snapshot.enable_status_bar {
            self.indicator.set_tooltip(reason);
        }

        if options.should_reveal(&snapshot) {
            self.provider.reveal(true);
        }
    }

    fn stop(&mut self, reason: &str) {
        if self.running {
            self.running = false;
            tracing::info!(reason, "Activity stopped");
            let outcome = self.provider.stop();
            log_post("stop", &outcome);
        }
        self.displayed_reason = reason.to_string();
        let outcome = self.provider.set_status(reason);
        log_post("status", &outcome);
        self.indicator.show_idle();
    }

    fn begin_context(
        &mut self,
        reason: &str,
        options: StartOptions,
        id: Option<ContextId>,
    ) -> ContextId {
        let id = id.unwrap_or_else(ContextId::generate);
        if self.disposed {
            tracing::warn!(context_id = %id, reason, "Ignoring context begun after dispose");
            return id;
        }
        tracing::debug!(context_id = %id, reason, "Context begun");
        self.contexts.insert(id.clone(), reason);
        self.start(reason, options);
        id
    }

    fn end_context(&mut self, id: &ContextId, completion: Option<&str>) {
        if self.contexts.remove(id).is_none() {
            tracing::trace!(context_id = %id, "Ignoring end of unknown context");
            return;
        }
        tracing::debug!(context_id = %id, remaining = self.contexts.len(), "Context ended");
        if self.manual.as_ref() == Some(id) {
            self.manual = None;
        }

        if self.contexts.is_empty() {
            self.stop(completion.unwrap_or(COMPLETION_FALLBACK));
            return;
        }

        let next = self
            .contexts
            .latest_reason()
            .unwrap_or(WORKING_FALLBACK)
            .to_string();
        self.start(&next, StartOptions::default());
    }

    fn stop_all(&mut self, reason: Option<&str>) {
        if self.disposed {
            return;
        }
        tracing::debug!(cleared = self.contexts.len(), "Stopping all contexts");
        self.contexts.clear();
        self.manual = None;
        self.stop(reason.unwrap_or(COMPLETION_FALLBACK));
    }

    fn refresh_visibility(&self) {
        self.indicator
            .set_visible(self.settings.snapshot().enable_status_bar);
    }
}

fn log_post(kind: &str, outcome: &PostOutcome) {
    if let PostOutcome::Failed(e) = outcome {
        tracing::warn!(kind, error = %e, "Failed to post panel message");
    }
}

/// Context-reference-counted activity controller
#[derive(Clone)]
pub struct ActivityController {
    inner: Arc<Mutex<ControllerState>>,
}

impl ActivityController {
    /// Create an idle controller
    ///
    /// The indicator starts idle and visible according to the current
    /// `enable_status_bar` setting.
    pub fn new(settings: Arc<dyn Settings>, sink: Arc<dyn StatusSink>) -> Self {
        let state = ControllerState {
            indicator: StatusIndicator::new(sink),
            provider: PanelProvider::new(),
            contexts: ContextSet::new(),
            manual: None,
            running: false,
            displayed_reason: COMPLETION_FALLBACK.to_string(),
            disposed: false,
            settings,
        };
        state.refresh_visibility();
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Begin a context and return its ID
    ///
    /// Uses `id` if given, otherwise generates a fresh one. Never fails.
    pub fn begin_context(
        &self,
        reason: &str,
        options: StartOptions,
        id: Option<ContextId>,
    ) -> ContextId {
        self.inner.lock().begin_context(reason, options, id)
    }

    /// End a context
    ///
    /// Unknown or already-ended IDs are ignored.
    pub fn end_context(&self, id: &ContextId, completion: Option<&str>) {
        self.inner.lock().end_context(id, completion);
    }

    /// Clear every context and go idle
    pub fn stop_all(&self, reason: Option<&str>) {
        self.inner.lock().stop_all(reason);
    }

    /// Run `task` inside a context
    ///
    /// The context ends when the task completes, and also if the returned
    /// future is dropped early or the task panics.
    pub async fn with_progress<F, T>(&self, options: ProgressOptions, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let reason = options.title.as_deref().unwrap_or(WORKING_FALLBACK);
        let start = StartOptions {
            auto_reveal: options.auto_reveal,
            force_reveal: false,
        };
        let id = self.begin_context(reason, start, None);
        let guard = ContextRelease::new(self.clone(), id, options.completion_message);
        let output = task.await;
        drop(guard);
        output
    }

    /// Flip the manual context on or off
    pub fn toggle(&self) {
        let mut state = self.inner.lock();
        if state.disposed {
            tracing::warn!("Ignoring toggle on a disposed controller");
            return;
        }
        if let Some(id) = state.manual.clone() {
            state.end_context(&id, Some(MANUAL_STOP));
            return;
        }
        let id = state.begin_context(
            MANUAL_REASON,
            StartOptions::force_reveal(),
            Some(ContextId::manual()),
        );
        state.manual = Some(id);
    }

    /// Run the demo context for [`DEMO_DURATION`]
    ///
    /// Returns at once on a disposed controller.
    pub async fn play_demo(&self) {
        if self.is_disposed() {
            tracing::warn!("Ignoring demo on a disposed controller");
            return;
        }
        let id = self.begin_context(DEMO_REASON, StartOptions::force_reveal(), None);
        let _guard = ContextRelease::new(self.clone(), id, Some(DEMO_COMPLETE.to_string()));
        tokio::time::sleep(DEMO_DURATION).await;
    }

    /// React to changed settings
    pub fn reconfigure(&self, changed: &[SettingKey]) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }
        if changed.contains(&SettingKey::EnableStatusBar) {
            state.refresh_visibility();
        }
        if !changed.iter().any(|key| key.affects_motion()) {
            return;
        }

        let snapshot = state.settings.snapshot();
        tracing::debug!(
            speed = %snapshot.animation_speed,
            reduced_motion = snapshot.reduced_motion,
            "Motion settings changed"
        );
        let outcome = state.provider.update_configuration(&snapshot);
        log_post("config", &outcome);

        if !state.running {
            return;
        }
        if snapshot.effective_reduced_motion() {
            state.indicator.show_engaged();
        } else {
            state.indicator.begin_animation(snapshot.animation_speed);
        }
    }

    /// Handle a message from the panel
    ///
    /// Returns the ready report for `ready`, `None` otherwise.
    pub fn handle_surface_event(&self, event: SurfaceEvent) -> Option<ReadyReport> {
        match event {
            SurfaceEvent::Ready => {
                let mut state = self.inner.lock();
                let snapshot = state.settings.snapshot();
                let report = state.provider.handle_ready(&snapshot);
                for e in &report.failures {
                    tracing::warn!(error = %e, "Panel message lost during flush");
                }
                Some(report)
            }
            SurfaceEvent::Toggle => {
                self.toggle();
                None
            }
        }
    }

    /// Attach a newly created panel surface
    pub fn resolve_surface(&self, surface: Arc<dyn PanelSurface>) {
        let mut state = self.inner.lock();
        if state.disposed {
            tracing::warn!("Ignoring panel surface for a disposed controller");
            return;
        }
        state.provider.resolve(surface);
    }

    /// The panel surface went away
    pub fn surface_disposed(&self) {
        self.inner.lock().provider.dispose_surface();
    }

    /// Force idle and release the panel
    ///
    /// Safe to call more than once.
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }
        state.stop_all(Some(DEACTIVATED));
        state.indicator.end_animation();
        state.provider.dispose();
        state.disposed = true;
        tracing::info!("Activity controller disposed");
    }

    /// Whether any context is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Reason currently displayed
    #[must_use]
    pub fn displayed_reason(&self) -> String {
        self.inner.lock().displayed_reason.clone()
    }

    /// Number of active contexts
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.inner.lock().contexts.len()
    }

    /// ID of the manual context, if active
    #[must_use]
    pub fn manual_context(&self) -> Option<ContextId> {
        self.inner.lock().manual.clone()
    }

    /// Whether the indicator frame timer is live
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inner.lock().indicator.is_animating()
    }

    /// Fresh read of the settings the controller uses
    #[must_use]
    pub fn settings_snapshot(&self) -> ConfigSnapshot {
        self.inner.lock().settings.snapshot()
    }

    /// Whether the controller has been disposed
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Current provider state
    #[must_use]
    pub fn provider_snapshot(&self) -> ProviderSnapshot {
        let state = self.inner.lock();
        ProviderSnapshot {
            has_surface: state.provider.has_surface(),
            ready: state.provider.is_ready(),
            pending: state.provider.pending_len(),
            pending_reveal: state.provider.pending_reveal(),
        }
    }
}

impl std::fmt::Debug for ActivityController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ActivityController")
            .field("running", &state.running)
            .field("contexts", &state.contexts.len())
            .field("displayed_reason", &state.displayed_reason)
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}

/// Ends a context when dropped
struct ContextRelease {
    controller: ActivityController,
    id: ContextId,
    completion: Option<String>,
}

impl ContextRelease {
    fn new(controller: ActivityController, id: ContextId, completion: Option<String>) -> Self {
        Self {
            controller,
            id,
            completion,
        }
    }
}

impl Drop for ContextRelease {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!(context_id = %self.id, "Ending context after panic");
        }
        self.controller
            .end_context(&self.id, self.completion.as_deref());
    }
}
