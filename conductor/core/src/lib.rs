//! Nyan Core - Context-Counted Activity Indicator
//!
//! This crate shows an animated "busy" state while any number of overlapping
//! activities (tasks, debug sessions, manual toggles, demo runs) are active,
//! and returns to idle once the last one ends. It is independent of any UI
//! framework: hosts supply a status-bar sink and a panel surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Host Environment                          │
//! │   tasks / debug sessions / commands          settings changes    │
//! └───────────────┬──────────────────────────────────┬───────────────┘
//!                 │        InboundEvent queue        │
//!                 ▼                                  ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Dispatcher ──► EventTracker (reduce) ──► ActivityController     │
//! │                                          │                │      │
//! │                                    ContextSet      ConfigSnapshot │
//! │                                          │                       │
//! │                      ┌───────────────────┴──────────┐            │
//! │                      ▼                              ▼            │
//! │               StatusIndicator                 PanelProvider      │
//! │             (frames / engaged)             (queue until ready)   │
//! └──────────────────────┬───────────────────────────────┬───────────┘
//!                        ▼                               ▼
//!                   StatusSink                 PanelSurface ──► PanelAnimation
//! ```
//!
//! # Key Types
//!
//! - [`ActivityController`]: owns the context set and drives both outputs
//! - [`PanelProvider`]: queued message channel to a panel that may not be
//!   ready yet
//! - [`PanelAnimation`]: the panel's frame-paced animation loop
//! - [`NyanHost`] / [`ProgressApi`]: explicit lifecycle and public API
//! - [`Dispatcher`]: applies the inbound event queue to the controller
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use nyan_core::{MemoryStatusSink, NyanHost, ProgressOptions, SharedSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let host = NyanHost::activate(
//!         Arc::new(SharedSettings::default()),
//!         Arc::new(MemoryStatusSink::new()),
//!     );
//!     let api = host.api();
//!
//!     let answer = api
//!         .with_progress(ProgressOptions::titled("Task: fetch"), async { 42 })
//!         .await
//!         .unwrap();
//!
//!     host.deactivate();
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod controller;
pub mod dispatch;
pub mod events;
pub mod host;
pub mod indicator;
pub mod messages;
pub mod panel;
pub mod provider;

// Re-export main types for convenience
pub use config::{
    default_config_path, detect_reduced_motion, load_config, load_config_from_path,
    AnimationSpeed, ConfigError, ConfigOverrides, ConfigSnapshot, ConfigSource, LoadedConfig,
    SettingKey, Settings, SharedSettings,
};
pub use context::{ContextId, ContextSet, COMPLETION_FALLBACK, STOPPED_BY_USER};
pub use controller::{
    ActivityController, ProgressOptions, ProviderSnapshot, StartOptions, DEMO_DURATION,
};
pub use dispatch::{Dispatcher, Effect, EventTracker};
pub use events::{Command, HostEvent, InboundEvent};
pub use host::{ApiError, ContextGuard, NyanHost, ProgressApi};
pub use indicator::{MemoryStatusSink, StatusIndicator, StatusSink, StatusState};
pub use messages::{MotionConfig, PanelMessage, SurfaceEvent};
pub use panel::{FrameOutcome, PanelAnimation, ToggleButton, TrackMetrics};
pub use provider::{
    ChannelSurface, DeliveryError, MarkupResources, PanelMarkup, PanelProvider, PanelSurface,
    PostOutcome, ReadyReport, RevealOutcome, SurfaceDirective,
};
