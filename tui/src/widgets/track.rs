//! Track Widget
//!
//! Draws the night-sky track and the flying cat at the panel's current
//! offset. Offsets are in the panel's pixel units; one terminal cell is
//! [`CELL_PX`] pixels wide.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use nyan_core::{PanelAnimation, TrackMetrics};

use crate::theme::{rainbow_band, CAT_BODY, SKY, STAR};

/// Pixels per terminal cell
pub const CELL_PX: f64 = 8.0;

/// The cat, nose to the right
pub const SPRITE: &str = "[:::]=^.^=";

/// Trail cells drawn behind the sprite
pub const TRAIL_CELLS: usize = 12;

/// Cells between stars
const STAR_SPACING: usize = 7;

/// Sprite width in cells
pub fn sprite_cells() -> usize {
    SPRITE.width()
}

/// Panel metrics for a track `width` cells wide
pub fn metrics_for(width: u16) -> TrackMetrics {
    TrackMetrics::new(
        f64::from(width) * CELL_PX,
        sprite_cells() as f64 * CELL_PX,
    )
}

/// Leftmost sprite cell for a visible offset; may be off either edge
pub fn sprite_column(visible_offset: f64) -> i64 {
    (visible_offset / CELL_PX).floor() as i64
}

/// Star field shift for a point in time
///
/// Holds at zero unless the panel is moving.
pub fn star_shift(panel: &PanelAnimation, elapsed_ms: f64) -> usize {
    if !panel.is_running() || panel.is_reduced_motion() {
        return 0;
    }
    let cycle_ms = panel.track_cycle_secs() * 1000.0;
    if cycle_ms <= 0.0 {
        return 0;
    }
    let progress = (elapsed_ms % cycle_ms) / cycle_ms;
    (progress * STAR_SPACING as f64) as usize % STAR_SPACING
}

/// Track with the cat on it
pub struct TrackWidget<'a> {
    panel: &'a PanelAnimation,
    elapsed_ms: f64,
}

impl<'a> TrackWidget<'a> {
    pub fn new(panel: &'a PanelAnimation, elapsed_ms: f64) -> Self {
        Self { panel, elapsed_ms }
    }
}

impl Widget for TrackWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let sky = Style::default().bg(SKY);
        let shift = star_shift(self.panel, self.elapsed_ms);
        for row in 0..area.height {
            for x in 0..area.width {
                let cell = &mut buf[(area.x + x, area.y + row)];
                cell.set_style(sky);
                let stagger = usize::from(row) * 3;
                if (usize::from(x) + shift + stagger) % STAR_SPACING == 0 {
                    cell.set_char('\u{00b7}').set_fg(STAR);
                } else {
                    cell.set_char(' ');
                }
            }
        }

        let row = area.y + area.height / 2;
        let width = i64::from(area.width);
        let column = sprite_column(self.panel.visible_offset());
        let mut put = |x: i64, ch: char, style: Style| {
            if (0..width).contains(&x) {
                // x is within 0..area.width here
                let x = area.x + x as u16;
                buf[(x, row)].set_char(ch).set_style(style);
            }
        };

        if self.panel.is_running() && !self.panel.is_reduced_motion() {
            for distance in 1..=TRAIL_CELLS {
                let band = rainbow_band(distance - 1);
                put(column - distance as i64, '=', sky.fg(band));
            }
        }

        let body = sky.fg(CAT_BODY).add_modifier(Modifier::BOLD);
        for (i, ch) in SPRITE.chars().enumerate() {
            put(column + i as i64, ch, body);
        }
    }
}
