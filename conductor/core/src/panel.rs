//! Panel Animation Loop
//!
//! The panel's side of the protocol. It applies [`PanelMessage`]s to its view
//! state and moves the sprite along a repeating track, one frame callback at
//! a time. Time is passed in as millisecond timestamps so any frame source
//! (a render loop, a test) can drive it.
//!
//! # Frame Pacing
//!
//! - Elapsed time per frame is clamped to [`MAX_STEP_MS`] so a stalled
//!   surface does not make the sprite jump.
//! - The offset wraps at `track + sprite + LOOP_MARGIN`, never less than 1.
//! - Under reduced motion frames are still requested but the sprite holds
//!   still.
//! - Once stopped, [`PanelAnimation::wants_frame`] is false and the frame
//!   source should stop calling [`PanelAnimation::step`].

use crate::config::AnimationSpeed;
use crate::messages::{MotionConfig, PanelMessage};

/// Largest elapsed time applied in one frame
pub const MAX_STEP_MS: f64 = 48.0;

/// Extra track length beyond the track and sprite widths
pub const LOOP_MARGIN: f64 = 120.0;

/// Sprite lead-in before the visible track starts
pub const VISIBLE_LEAD: f64 = 60.0;

/// Status shown while idle
pub const STANDING_BY: &str = "Standing by\u{2026}";

/// Status shown when started without a reason
pub const IN_PROGRESS: &str = "In progress\u{2026}";

/// Seconds per track cycle at normal speed
const BASE_TRACK_CYCLE_SECS: f64 = 3.6;

/// Widths of the rendered track and sprite, in pixels or cells
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackMetrics {
    /// Track width
    pub track_width: f64,
    /// Sprite width
    pub sprite_width: f64,
}

impl TrackMetrics {
    /// Metrics from widths
    #[must_use]
    pub fn new(track_width: f64, sprite_width: f64) -> Self {
        Self {
            track_width,
            sprite_width,
        }
    }

    /// Offset at which the sprite position wraps
    #[must_use]
    pub fn loop_length(&self) -> f64 {
        (self.track_width + self.sprite_width + LOOP_MARGIN).max(1.0)
    }
}

/// What one frame did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Not running; no further frames wanted
    Idle,
    /// Running under reduced motion; sprite unchanged
    Held,
    /// Sprite moved to this visible offset
    Moved(f64),
}

/// Toggle button presentation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleButton {
    /// Visible label
    pub label: &'static str,
    /// Accessible label
    pub aria_label: &'static str,
    /// `running` or `idle`
    pub state: &'static str,
    /// Pressed state
    pub pressed: bool,
}

impl ToggleButton {
    fn for_running(running: bool) -> Self {
        if running {
            Self {
                label: "\u{275a}\u{275a}",
                aria_label: "Stop animation",
                state: "running",
                pressed: true,
            }
        } else {
            Self {
                label: "\u{25b6}",
                aria_label: "Start animation",
                state: "idle",
                pressed: false,
            }
        }
    }
}

/// Panel-side animation state
#[derive(Clone, Debug)]
pub struct PanelAnimation {
    running: bool,
    status: String,
    speed: AnimationSpeed,
    configured_reduced: bool,
    prefers_reduced: bool,
    reduced_motion: bool,
    px_per_ms: f64,
    offset: f64,
    visible_offset: f64,
    last_timestamp: Option<f64>,
}

impl Default for PanelAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelAnimation {
    /// Idle panel at normal speed
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: false,
            status: STANDING_BY.to_string(),
            speed: AnimationSpeed::Normal,
            configured_reduced: false,
            prefers_reduced: false,
            reduced_motion: false,
            px_per_ms: AnimationSpeed::Normal.px_per_ms(),
            offset: 0.0,
            visible_offset: 0.0,
            last_timestamp: None,
        }
    }

    /// Apply one message from the controller
    pub fn handle_message(&mut self, message: &PanelMessage) {
        tracing::trace!(kind = message.kind(), running = self.running, "Panel message");
        match message {
            PanelMessage::Start { reason, config } => self.start(reason, Some(config)),
            PanelMessage::Stop => self.stop(None),
            PanelMessage::Config(config) => self.apply_configuration(Some(config)),
            PanelMessage::Status(text) => self.set_status(text),
        }
    }

    /// Begin moving from the start of the track
    pub fn start(&mut self, reason: &str, config: Option<&MotionConfig>) {
        self.running = true;
        self.status = if reason.is_empty() {
            IN_PROGRESS.to_string()
        } else {
            reason.to_string()
        };
        self.offset = 0.0;
        self.visible_offset = 0.0;
        self.apply_configuration(config);
        self.last_timestamp = None;
    }

    /// Stop and return the sprite home
    pub fn stop(&mut self, status: Option<&str>) {
        self.running = false;
        self.last_timestamp = None;
        self.offset = 0.0;
        self.visible_offset = 0.0;
        self.status = status.unwrap_or(STANDING_BY).to_string();
    }

    /// Merge `config` into the cached settings and re-resolve motion
    ///
    /// Fields missing from `config` keep their cached values.
    pub fn apply_configuration(&mut self, config: Option<&MotionConfig>) {
        if let Some(config) = config {
            if let Some(speed) = config.animation_speed {
                self.speed = speed;
            }
            if let Some(reduced) = config.reduced_motion {
                self.configured_reduced = reduced;
            }
        }

        self.px_per_ms = self.speed.px_per_ms();
        self.reduced_motion = self.configured_reduced || self.prefers_reduced;
        if self.reduced_motion {
            self.offset = 0.0;
            self.visible_offset = 0.0;
        }
    }

    /// External reduced-motion preference changed
    pub fn set_prefers_reduced_motion(&mut self, prefers: bool) {
        self.prefers_reduced = prefers;
        self.apply_configuration(None);
    }

    /// Replace the status line
    pub fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
    }

    /// Advance one frame
    pub fn step(&mut self, timestamp_ms: f64, metrics: TrackMetrics) -> FrameOutcome {
        if !self.running {
            return FrameOutcome::Idle;
        }

        let last = *self.last_timestamp.get_or_insert(timestamp_ms);
        self.last_timestamp = Some(timestamp_ms);
        if self.reduced_motion {
            return FrameOutcome::Held;
        }

        let delta = (timestamp_ms - last).clamp(0.0, MAX_STEP_MS);
        self.offset = (self.offset + delta * self.px_per_ms) % metrics.loop_length();
        self.visible_offset = self.offset - metrics.sprite_width - VISIBLE_LEAD;
        FrameOutcome::Moved(self.visible_offset)
    }

    /// Whether the frame source should keep calling [`Self::step`]
    #[must_use]
    pub fn wants_frame(&self) -> bool {
        self.running
    }

    /// Seconds for the background track to scroll one cycle
    #[must_use]
    pub fn track_cycle_secs(&self) -> f64 {
        BASE_TRACK_CYCLE_SECS * AnimationSpeed::Normal.px_per_ms() / self.px_per_ms
    }

    /// Whether the animation is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the panel is marked busy for assistive technology
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.running
    }

    /// Effective reduced motion
    #[must_use]
    pub fn is_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Status line text
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Resolved speed
    #[must_use]
    pub fn speed(&self) -> AnimationSpeed {
        self.speed
    }

    /// Track speed in pixels per millisecond
    #[must_use]
    pub fn px_per_ms(&self) -> f64 {
        self.px_per_ms
    }

    /// Raw offset along the loop
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Sprite position relative to the visible track
    #[must_use]
    pub fn visible_offset(&self) -> f64 {
        self.visible_offset
    }

    /// Toggle button presentation
    #[must_use]
    pub fn button(&self) -> ToggleButton {
        ToggleButton::for_running(self.running)
    }
}
