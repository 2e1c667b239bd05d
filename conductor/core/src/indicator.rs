//! Status-Bar Indicator
//!
//! The compact, always-visible display. While running it cycles through a
//! short strip of frames on a tokio interval; under reduced motion it shows a
//! single static "engaged" frame instead.
//!
//! Only one frame timer exists at a time: every start path aborts the
//! previous timer before spawning a new one, and the timer is aborted on
//! idle, on reduced motion and on drop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::AnimationSpeed;

/// Cat flying along the rainbow
pub const STATUS_FRAMES: [&str; 8] = [
    "🐱🟥🟧🟨🟩🟦🟪✨",
    "🟥🐱🟧🟨🟩🟦🟪✨",
    "🟥🟧🐱🟨🟩🟦🟪✨",
    "🟥🟧🟨🐱🟩🟦🟪✨",
    "🟥🟧🟨🟩🐱🟦🟪✨",
    "🟥🟧🟨🟩🟦🐱🟪✨",
    "🟥🟧🟨🟩🟦🟪🐱✨",
    "🟥🟧🟨🟩🟦🟪✨🐱",
];

/// Indicator icon prefix
pub const ICON: &str = "🚀";

/// Text shown while idle
pub const IDLE_TEXT: &str = "🚀 Nyan idle";

/// Tooltip shown while idle
pub const IDLE_TOOLTIP: &str = "Show the Nyan progress animation";

/// Static frame shown under reduced motion
pub const ENGAGED_TEXT: &str = "🚀 Nyan engaged";

/// Frame period at normal speed
const BASE_PERIOD_MS: f64 = 220.0;

/// Shortest allowed frame period
const MIN_PERIOD_MS: u64 = 90;

/// Host-side status-bar item
pub trait StatusSink: Send + Sync {
    /// Replace the visible text
    fn set_text(&self, text: &str);
    /// Replace the tooltip
    fn set_tooltip(&self, tooltip: &str);
    /// Show or hide the item
    fn set_visible(&self, visible: bool);
}

/// Last values written to a [`MemoryStatusSink`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusState {
    /// Visible text
    pub text: String,
    /// Tooltip
    pub tooltip: String,
    /// Visibility
    pub visible: bool,
    /// Number of text updates received
    pub text_updates: u64,
}

/// In-memory sink for headless hosts and tests
#[derive(Clone, Debug, Default)]
pub struct MemoryStatusSink {
    state: Arc<Mutex<StatusState>>,
}

impl MemoryStatusSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    #[must_use]
    pub fn state(&self) -> StatusState {
        self.state.lock().clone()
    }

    /// Current text
    #[must_use]
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    /// Current tooltip
    #[must_use]
    pub fn tooltip(&self) -> String {
        self.state.lock().tooltip.clone()
    }
}

impl StatusSink for MemoryStatusSink {
    fn set_text(&self, text: &str) {
        let mut state = self.state.lock();
        state.text = text.to_string();
        state.text_updates += 1;
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.state.lock().tooltip = tooltip.to_string();
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }
}

/// Timer period for a speed setting
#[must_use]
pub fn frame_period(speed: AnimationSpeed) -> Duration {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (BASE_PERIOD_MS / speed.multiplier()).round() as u64;
    Duration::from_millis(scaled.max(MIN_PERIOD_MS))
}

/// Indicator text for a frame index
#[must_use]
pub fn frame_text(index: usize) -> String {
    format!("{ICON} {}", STATUS_FRAMES[index % STATUS_FRAMES.len()])
}

/// Status-bar indicator with its frame timer
pub struct StatusIndicator {
    sink: Arc<dyn StatusSink>,
    timer: Option<JoinHandle<()>>,
}

impl StatusIndicator {
    /// Create an idle indicator
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        sink.set_text(IDLE_TEXT);
        sink.set_tooltip(IDLE_TOOLTIP);
        Self { sink, timer: None }
    }

    /// Start cycling frames, replacing any running timer
    pub fn begin_animation(&mut self, speed: AnimationSpeed) {
        self.end_animation();
        self.sink.set_text(&frame_text(0));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime for the indicator timer, showing static frame");
            self.sink.set_text(ENGAGED_TEXT);
            return;
        };

        let period = frame_period(speed);
        let sink = Arc::clone(&self.sink);
        self.timer = Some(runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            let mut frame = 1usize;
            loop {
                interval.tick().await;
                sink.set_text(&frame_text(frame));
                frame = (frame + 1) % STATUS_FRAMES.len();
            }
        }));
        tracing::debug!(period_ms = period.as_millis() as u64, "Indicator animation started");
    }

    /// Cancel the frame timer, if any
    pub fn end_animation(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::debug!("Indicator animation stopped");
        }
    }

    /// Whether a frame timer is live
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Replace the animation with the static engaged frame
    pub fn show_engaged(&mut self) {
        self.end_animation();
        self.sink.set_text(ENGAGED_TEXT);
    }

    /// Return to the idle text and tooltip
    pub fn show_idle(&mut self) {
        self.end_animation();
        self.sink.set_text(IDLE_TEXT);
        self.sink.set_tooltip(IDLE_TOOLTIP);
    }

    /// Replace the tooltip
    pub fn set_tooltip(&self, tooltip: &str) {
        self.sink.set_tooltip(tooltip);
    }

    /// Show or hide the item
    pub fn set_visible(&self, visible: bool) {
        self.sink.set_visible(visible);
    }
}

impl Drop for StatusIndicator {
    fn drop(&mut self) {
        self.end_animation();
    }
}

impl std::fmt::Debug for StatusIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusIndicator")
            .field("animating", &self.is_animating())
            .finish()
    }
}
