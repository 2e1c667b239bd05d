//! Nyan TUI - Terminal panel for Nyan Progress
//!
//! Runs the activity controller in-process and draws its panel in the
//! terminal: a status line, the star-field track and the flying cat.
//!
//! # Architecture
//!
//! - **App**: event loop, key bindings and layout
//! - **Bridge**: the receiving end of the controller's panel channel
//! - **Widgets**: the track and sprite
//! - **Theme**: rainbow palette

pub mod app;
pub mod bridge;
pub mod theme;
pub mod widgets;

pub use app::App;
pub use bridge::PanelBridge;
