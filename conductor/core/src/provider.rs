//! Panel Provider - Message Channel to the Presentation Surface
//!
//! The panel's lifecycle (created, ready, disposed) is driven by the host and
//! is independent of the controller. The provider decouples the two:
//!
//! ```text
//!  Controller ──post_message──► PanelProvider ──post──► PanelSurface
//!                                   │  ▲
//!                     queue until   │  │ ready / dispose
//!                     ready, then   ▼  │
//!                     flush FIFO  [pending queue]  [pending reveal]
//! ```
//!
//! - Messages posted before the surface is ready are queued and flushed in
//!   order exactly once when the surface reports `ready`.
//! - A reveal requested before readiness is remembered; later requests
//!   overwrite earlier ones.
//! - When the surface goes away the queue survives (it is replayed to the
//!   next surface) but the pending reveal is dropped.
//!
//! Delivery is best-effort: failures are returned as values for the caller
//! to log and are never retried.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::ConfigSnapshot;
use crate::messages::{MotionConfig, PanelMessage};

/// Why a message could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The surface has gone away
    #[error("panel channel is closed")]
    Closed,
    /// Surface-specific failure
    #[error("panel rejected message: {0}")]
    Rejected(String),
}

// ============================================================================
// Surface
// ============================================================================

/// A presentation surface that hosts the panel
pub trait PanelSurface: Send + Sync {
    /// Load the initial document (called once per surface)
    fn load(&self, markup: &PanelMarkup);

    /// Deliver a message
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the surface cannot accept the message.
    fn post(&self, message: &PanelMessage) -> Result<(), DeliveryError>;

    /// Bring the panel to the front
    fn show(&self, preserve_focus: bool);
}

/// Everything a [`ChannelSurface`] forwards to its owner
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceDirective {
    /// Initial document
    Markup(PanelMarkup),
    /// Protocol message
    Message(PanelMessage),
    /// Bring to front
    Reveal {
        /// Keep keyboard focus where it is
        preserve_focus: bool,
    },
}

/// Surface backed by an unbounded tokio channel
///
/// The receiving end belongs to whatever actually renders the panel. A ready
/// flush delivers the whole pending queue in one go, so the channel never
/// refuses a message while the renderer is listening.
#[derive(Clone, Debug)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<SurfaceDirective>,
}

impl ChannelSurface {
    /// Create a surface and the receiver its renderer reads from
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceDirective>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Whether the renderer is still listening
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    fn forward(&self, directive: SurfaceDirective) -> Result<(), DeliveryError> {
        self.tx.send(directive).map_err(|_| DeliveryError::Closed)
    }
}

impl PanelSurface for ChannelSurface {
    fn load(&self, markup: &PanelMarkup) {
        if let Err(e) = self.forward(SurfaceDirective::Markup(markup.clone())) {
            tracing::warn!(error = %e, "Failed to load panel markup");
        }
    }

    fn post(&self, message: &PanelMessage) -> Result<(), DeliveryError> {
        self.forward(SurfaceDirective::Message(message.clone()))
    }

    fn show(&self, preserve_focus: bool) {
        if let Err(e) = self.forward(SurfaceDirective::Reveal { preserve_focus }) {
            tracing::warn!(error = %e, "Failed to reveal panel");
        }
    }
}

// ============================================================================
// Markup
// ============================================================================

/// Status line before the first message arrives
pub const INITIAL_STATUS: &str = "Ready for takeoff\u{2026}";

/// Initial panel document
///
/// Rendered once per surface creation; everything after that arrives as
/// [`PanelMessage`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelMarkup {
    /// Status line text
    pub status_text: String,
    /// Toggle button label while idle
    pub idle_label: &'static str,
    /// Toggle button label while running
    pub running_label: &'static str,
    /// Script nonce for the content security policy
    pub nonce: String,
}

impl PanelMarkup {
    /// Render a fresh document with a new nonce
    #[must_use]
    pub fn render() -> Self {
        Self {
            status_text: INITIAL_STATUS.to_string(),
            idle_label: "\u{25b6}",
            running_label: "\u{275a}\u{275a}",
            nonce: create_nonce(),
        }
    }

    /// Full HTML shell for web-view hosts
    #[must_use]
    pub fn to_html(&self, resources: &MarkupResources) -> String {
        let csp = &resources.csp_source;
        let nonce = &self.nonce;
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta http-equiv="Content-Security-Policy" content="default-src 'none'; img-src {csp} data:; style-src {csp}; script-src 'nonce-{nonce}';">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <link rel="stylesheet" href="{style}">
  <title>Nyan Progress</title>
</head>
<body>
  <div class="nyan-shell" role="status" aria-live="polite" aria-atomic="true" aria-busy="false">
    <div class="status-line">
      <span class="status-text">{status}</span>
      <button class="action-btn" type="button" data-action="toggle" aria-label="Toggle animation" aria-pressed="false" title="Toggle Nyan animation">{label}</button>
    </div>
    <div class="viewport" aria-hidden="true">
      <div class="starfield" aria-hidden="true"></div>
      <div class="sparkles" aria-hidden="true"></div>
      <div class="rainbow-track" aria-hidden="true"></div>
      <div class="nyan-cat" data-facing="right" aria-hidden="true">
        <img class="sprite sprite-right" src="{sprite_right}" alt="" draggable="false"/>
        <img class="sprite sprite-left" src="{sprite_left}" alt="" draggable="false"/>
      </div>
    </div>
  </div>
  <script nonce="{nonce}" src="{script}"></script>
</body>
</html>"#,
            style = resources.style_uri,
            status = self.status_text,
            label = self.idle_label,
            sprite_right = resources.sprite_right_uri,
            sprite_left = resources.sprite_left_uri,
            script = resources.script_uri,
        )
    }
}

/// Resource locations for [`PanelMarkup::to_html`]
#[derive(Clone, Debug, Default)]
pub struct MarkupResources {
    /// Allowed source for images and styles
    pub csp_source: String,
    /// Stylesheet URI
    pub style_uri: String,
    /// Panel script URI
    pub script_uri: String,
    /// Right-facing sprite URI
    pub sprite_right_uri: String,
    /// Left-facing sprite URI
    pub sprite_left_uri: String,
}

fn create_nonce() -> String {
    const POSSIBLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| char::from(POSSIBLE[rng.gen_range(0..POSSIBLE.len())]))
        .collect()
}

// ============================================================================
// Provider
// ============================================================================

/// Result of posting a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Handed to a ready surface
    Delivered,
    /// Held until the surface is ready
    Queued,
    /// The ready surface refused it (not retried)
    Failed(DeliveryError),
}

/// Result of a reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The surface was brought to front
    Shown,
    /// Stored until the surface is ready
    Deferred,
}

/// What happened when the surface reported ready
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyReport {
    /// Messages flushed from the queue
    pub flushed: usize,
    /// Flushed messages the surface refused
    pub failures: Vec<DeliveryError>,
    /// Pending reveal that was resolved, if any
    pub revealed: Option<bool>,
}

/// Queued, single-consumer channel to the panel
#[derive(Default)]
pub struct PanelProvider {
    surface: Option<Arc<dyn PanelSurface>>,
    ready: bool,
    pending: VecDeque<PanelMessage>,
    /// `Some(preserve_focus)` while a reveal is waiting for readiness
    pending_reveal: Option<bool>,
}

impl PanelProvider {
    /// Create a provider with no surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a newly created surface
    ///
    /// The markup is rendered once here; readiness is reset until the
    /// surface reports `ready`.
    pub fn resolve(&mut self, surface: Arc<dyn PanelSurface>) {
        tracing::info!(pending = self.pending.len(), "Panel surface resolved");
        surface.load(&PanelMarkup::render());
        self.surface = Some(surface);
        self.ready = false;
        self.flush();
    }

    /// Handle the surface's `ready` signal
    ///
    /// Flushes the queue in order, pushes fresh settings and resolves any
    /// pending reveal.
    pub fn handle_ready(&mut self, snapshot: &ConfigSnapshot) -> ReadyReport {
        if self.surface.is_none() {
            tracing::warn!("Ready signal without a panel surface");
            return ReadyReport::default();
        }
        tracing::info!(pending = self.pending.len(), "Panel ready, flushing queue");
        self.ready = true;

        let mut report = self.flush();
        if let PostOutcome::Failed(e) =
            self.post_message(PanelMessage::Config(MotionConfig::from(snapshot)))
        {
            report.failures.push(e);
        }

        if let (Some(preserve_focus), Some(surface)) = (self.pending_reveal.take(), &self.surface)
        {
            tracing::debug!(preserve_focus, "Revealing panel after ready");
            surface.show(preserve_focus);
            report.revealed = Some(preserve_focus);
        }
        report
    }

    /// Handle disposal of the surface
    ///
    /// The queue is kept for the next surface; the pending reveal is stale.
    pub fn dispose_surface(&mut self) {
        tracing::info!(pending = self.pending.len(), "Panel surface disposed");
        self.surface = None;
        self.ready = false;
        self.pending_reveal = None;
    }

    /// Deliver now if ready, otherwise queue
    pub fn post_message(&mut self, message: PanelMessage) -> PostOutcome {
        match (&self.surface, self.ready) {
            (Some(surface), true) => {
                tracing::trace!(kind = message.kind(), "Sending panel message");
                match surface.post(&message) {
                    Ok(()) => PostOutcome::Delivered,
                    Err(e) => PostOutcome::Failed(e),
                }
            }
            _ => {
                tracing::trace!(
                    kind = message.kind(),
                    has_surface = self.surface.is_some(),
                    "Queueing panel message"
                );
                self.pending.push_back(message);
                PostOutcome::Queued
            }
        }
    }

    /// Bring the panel to front now, or once it is ready
    pub fn reveal(&mut self, preserve_focus: bool) -> RevealOutcome {
        match (&self.surface, self.ready) {
            (Some(surface), true) => {
                surface.show(preserve_focus);
                self.pending_reveal = None;
                RevealOutcome::Shown
            }
            _ => {
                tracing::debug!(preserve_focus, "Deferring panel reveal");
                self.pending_reveal = Some(preserve_focus);
                RevealOutcome::Deferred
            }
        }
    }

    /// Post `start`
    pub fn start(&mut self, reason: &str, snapshot: &ConfigSnapshot) -> PostOutcome {
        self.post_message(PanelMessage::Start {
            reason: reason.to_string(),
            config: MotionConfig::from(snapshot),
        })
    }

    /// Post `stop`
    pub fn stop(&mut self) -> PostOutcome {
        self.post_message(PanelMessage::Stop)
    }

    /// Post fresh settings
    pub fn update_configuration(&mut self, snapshot: &ConfigSnapshot) -> PostOutcome {
        self.post_message(PanelMessage::Config(MotionConfig::from(snapshot)))
    }

    /// Post a status line
    pub fn set_status(&mut self, text: &str) -> PostOutcome {
        self.post_message(PanelMessage::Status(text.to_string()))
    }

    /// Release the surface and drop everything queued
    pub fn dispose(&mut self) {
        self.surface = None;
        self.ready = false;
        self.pending.clear();
        self.pending_reveal = None;
    }

    /// Whether a surface is attached and ready
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready && self.surface.is_some()
    }

    /// Whether a surface is attached
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Number of queued messages
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending reveal, if any
    #[must_use]
    pub fn pending_reveal(&self) -> Option<bool> {
        self.pending_reveal
    }

    fn flush(&mut self) -> ReadyReport {
        let mut report = ReadyReport::default();
        let Some(surface) = self.surface.as_ref().filter(|_| self.ready) else {
            return report;
        };
        for message in self.pending.drain(..) {
            report.flushed += 1;
            if let Err(e) = surface.post(&message) {
                tracing::warn!(kind = message.kind(), error = %e, "Failed to flush panel message");
                report.failures.push(e);
            }
        }
        report
    }
}

impl fmt::Debug for PanelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelProvider")
            .field("has_surface", &self.surface.is_some())
            .field("ready", &self.ready)
            .field("pending", &self.pending.len())
            .field("pending_reveal", &self.pending_reveal)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Records every call made on it
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) loads: Mutex<usize>,
        pub(crate) messages: Mutex<Vec<PanelMessage>>,
        pub(crate) reveals: Mutex<Vec<bool>>,
        pub(crate) fail: Mutex<bool>,
    }

    impl RecordingSurface {
        pub(crate) fn kinds(&self) -> Vec<&'static str> {
            self.messages.lock().iter().map(PanelMessage::kind).collect()
        }
    }

    impl PanelSurface for RecordingSurface {
        fn load(&self, _markup: &PanelMarkup) {
            *self.loads.lock() += 1;
        }

        fn post(&self, message: &PanelMessage) -> Result<(), DeliveryError> {
            if *self.fail.lock() {
                return Err(DeliveryError::Rejected("test".into()));
            }
            self.messages.lock().push(message.clone());
            Ok(())
        }

        fn show(&self, preserve_focus: bool) {
            self.reveals.lock().push(preserve_focus);
        }
    }

    fn status(text: &str) -> PanelMessage {
        PanelMessage::Status(text.to_string())
    }

    #[test]
    fn test_queues_until_ready_then_flushes_in_order() {
        let mut provider = PanelProvider::new();
        assert_eq!(provider.post_message(status("one")), PostOutcome::Queued);
        assert_eq!(provider.post_message(status("two")), PostOutcome::Queued);

        let surface = Arc::new(RecordingSurface::default());
        provider.resolve(surface.clone());
        assert_eq!(provider.post_message(status("three")), PostOutcome::Queued);
        assert!(surface.messages.lock().is_empty());

        let report = provider.handle_ready(&ConfigSnapshot::default());
        assert_eq!(report.flushed, 3);
        assert_eq!(
            *surface.messages.lock(),
            vec![
                status("one"),
                status("two"),
                status("three"),
                PanelMessage::Config(MotionConfig::from(&ConfigSnapshot::default())),
            ]
        );
        assert_eq!(provider.pending_len(), 0);

        assert_eq!(provider.post_message(status("four")), PostOutcome::Delivered);
        assert_eq!(surface.messages.lock().len(), 5);
    }

    #[test]
    fn test_markup_rendered_once_per_surface() {
        let mut provider = PanelProvider::new();
        let surface = Arc::new(RecordingSurface::default());
        provider.resolve(surface.clone());
        provider.handle_ready(&ConfigSnapshot::default());
        provider.set_status("hello");
        assert_eq!(*surface.loads.lock(), 1);
    }

    #[test]
    fn test_reveal_coalesces_before_ready() {
        let mut provider = PanelProvider::new();
        let surface = Arc::new(RecordingSurface::default());
        provider.resolve(surface.clone());

        assert_eq!(provider.reveal(false), RevealOutcome::Deferred);
        assert_eq!(provider.reveal(true), RevealOutcome::Deferred);
        assert!(surface.reveals.lock().is_empty());

        let report = provider.handle_ready(&ConfigSnapshot::default());
        assert_eq!(report.revealed, Some(true));
        assert_eq!(*surface.reveals.lock(), vec![true]);
        assert_eq!(provider.pending_reveal(), None);
    }

    #[test]
    fn test_reveal_immediately_when_ready() {
        let mut provider = PanelProvider::new();
        let surface = Arc::new(RecordingSurface::default());
        provider.resolve(surface.clone());
        provider.handle_ready(&ConfigSnapshot::default());

        assert_eq!(provider.reveal(false), RevealOutcome::Shown);
        assert_eq!(*surface.reveals.lock(), vec![false]);
    }

    #[test]
    fn test_dispose_surface_keeps_queue_drops_reveal() {
        let mut provider = PanelProvider::new();
        let first = Arc::new(RecordingSurface::default());
        provider.resolve(first.clone());
        provider.post_message(status("queued"));
        provider.reveal(true);

        provider.dispose_surface();
        assert!(!provider.has_surface());
        assert_eq!(provider.pending_len(), 1);
        assert_eq!(provider.pending_reveal(), None);

        let second = Arc::new(RecordingSurface::default());
        provider.resolve(second.clone());
        let report = provider.handle_ready(&ConfigSnapshot::default());
        assert_eq!(report.flushed, 1);
        assert_eq!(report.revealed, None);
        assert_eq!(second.kinds(), vec!["status", "config"]);
        assert!(first.messages.lock().is_empty());
    }

    #[test]
    fn test_resolve_resets_readiness() {
        let mut provider = PanelProvider::new();
        provider.resolve(Arc::new(RecordingSurface::default()));
        provider.handle_ready(&ConfigSnapshot::default());
        assert!(provider.is_ready());

        provider.resolve(Arc::new(RecordingSurface::default()));
        assert!(!provider.is_ready());
        assert_eq!(provider.post_message(PanelMessage::Stop), PostOutcome::Queued);
    }

    #[test]
    fn test_delivery_failure_is_reported_not_retried() {
        let mut provider = PanelProvider::new();
        let surface = Arc::new(RecordingSurface::default());
        provider.resolve(surface.clone());
        provider.handle_ready(&ConfigSnapshot::default());

        *surface.fail.lock() = true;
        assert!(matches!(
            provider.post_message(PanelMessage::Stop),
            PostOutcome::Failed(DeliveryError::Rejected(_))
        ));
        assert_eq!(provider.pending_len(), 0);
    }

    #[test]
    fn test_ready_without_surface_is_ignored() {
        let mut provider = PanelProvider::new();
        provider.post_message(PanelMessage::Stop);
        let report = provider.handle_ready(&ConfigSnapshot::default());
        assert_eq!(report, ReadyReport::default());
        assert!(!provider.is_ready());
        assert_eq!(provider.pending_len(), 1);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let mut provider = PanelProvider::new();
        provider.resolve(Arc::new(RecordingSurface::default()));
        provider.post_message(PanelMessage::Stop);
        provider.reveal(true);
        provider.dispose();
        assert!(!provider.has_surface());
        assert_eq!(provider.pending_len(), 0);
        assert_eq!(provider.pending_reveal(), None);
    }

    #[tokio::test]
    async fn test_channel_surface_forwards_directives() {
        let (surface, mut rx) = ChannelSurface::new();
        let mut provider = PanelProvider::new();
        provider.resolve(Arc::new(surface.clone()));
        provider.set_status("queued");
        provider.handle_ready(&ConfigSnapshot::default());
        provider.reveal(true);

        assert!(matches!(rx.recv().await, Some(SurfaceDirective::Markup(_))));
        assert_eq!(
            rx.recv().await,
            Some(SurfaceDirective::Message(status("queued")))
        );
        assert!(matches!(
            rx.recv().await,
            Some(SurfaceDirective::Message(PanelMessage::Config(_)))
        ));
        assert_eq!(
            rx.recv().await,
            Some(SurfaceDirective::Reveal {
                preserve_focus: true
            })
        );
    }

    #[test]
    fn test_channel_surface_errors() {
        let (surface, rx) = ChannelSurface::new();
        for _ in 0..500 {
            assert_eq!(surface.post(&PanelMessage::Stop), Ok(()));
        }
        assert!(surface.is_connected());
        drop(rx);
        assert!(!surface.is_connected());
        assert_eq!(surface.post(&PanelMessage::Stop), Err(DeliveryError::Closed));
    }

    #[test]
    fn test_channel_surface_takes_long_flush() {
        let (surface, mut rx) = ChannelSurface::new();
        let mut provider = PanelProvider::new();
        provider.resolve(Arc::new(surface));
        for i in 0..100 {
            provider.set_status(&format!("step {i}"));
        }
        provider.post_message(PanelMessage::Stop);

        let report = provider.handle_ready(&ConfigSnapshot::default());
        assert!(report.failures.is_empty());
        assert_eq!(provider.pending_len(), 0);

        let mut last = None;
        while let Ok(directive) = rx.try_recv() {
            last = Some(directive);
        }
        assert!(matches!(
            last,
            Some(SurfaceDirective::Message(PanelMessage::Config(_)))
        ));
    }

    #[test]
    fn test_markup_html_carries_nonce() {
        let markup = PanelMarkup::render();
        assert_eq!(markup.nonce.len(), 32);
        assert_ne!(markup.nonce, PanelMarkup::render().nonce);

        let html = markup.to_html(&MarkupResources {
            csp_source: "vscode-resource:".into(),
            ..MarkupResources::default()
        });
        assert!(html.contains(&format!("script-src 'nonce-{}'", markup.nonce)));
        assert!(html.contains(INITIAL_STATUS));
        assert!(html.contains("img-src vscode-resource: data:"));
    }
}
