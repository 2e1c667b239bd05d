//! Status line on stderr
//!
//! Redraws a single terminal line in place with the indicator text and
//! tooltip. Nothing is drawn while the item is hidden.

use std::io::Write;

use parking_lot::Mutex;

use nyan_core::StatusSink;

#[derive(Debug, Default)]
struct LineState {
    text: String,
    tooltip: String,
    visible: bool,
}

/// Clear the current line and return to column 0
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Render the line for a given state
pub fn render_line(text: &str, tooltip: &str) -> String {
    if tooltip.is_empty() || tooltip == text {
        format!("{CLEAR_LINE}{text}")
    } else {
        format!("{CLEAR_LINE}{text}  {tooltip}")
    }
}

/// Indicator drawn on stderr
#[derive(Debug, Default)]
pub struct StderrSink {
    state: Mutex<LineState>,
}

impl StderrSink {
    /// Create a hidden sink
    pub fn new() -> Self {
        Self::default()
    }

    fn redraw(&self, edit: impl FnOnce(&mut LineState)) {
        let mut state = self.state.lock();
        edit(&mut state);
        let line = if state.visible {
            render_line(&state.text, &state.tooltip)
        } else {
            CLEAR_LINE.to_string()
        };
        let mut stderr = std::io::stderr().lock();
        if let Err(e) = stderr.write_all(line.as_bytes()).and_then(|()| stderr.flush()) {
            tracing::trace!(error = %e, "Failed to draw status line");
        }
    }
}

impl StatusSink for StderrSink {
    fn set_text(&self, text: &str) {
        self.redraw(|state| state.text = text.to_string());
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.redraw(|state| state.tooltip = tooltip.to_string());
    }

    fn set_visible(&self, visible: bool) {
        self.redraw(|state| state.visible = visible);
    }
}

/// Move past the status line before exiting
pub fn finish_line() {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr);
}
