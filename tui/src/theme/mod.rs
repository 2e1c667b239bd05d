//! Theme and Colors
//!
//! The panel palette: a six-band rainbow for the trail, a night-sky track
//! and a handful of UI accents.

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Rainbow Trail
// ============================================================================

/// Trail bands, front to back
pub const RAINBOW: [Color; 6] = [
    Color::Rgb(255, 64, 64),   // Red
    Color::Rgb(255, 165, 0),   // Orange
    Color::Rgb(255, 230, 64),  // Yellow
    Color::Rgb(80, 220, 100),  // Green
    Color::Rgb(80, 150, 255),  // Blue
    Color::Rgb(150, 90, 230),  // Violet
];

// ============================================================================
// Track
// ============================================================================

/// Night sky behind the sprite
pub const SKY: Color = Color::Rgb(16, 32, 72);

/// Twinkling stars
pub const STAR: Color = Color::Rgb(200, 210, 255);

/// Cat body - pop-tart pink
pub const CAT_BODY: Color = Color::Rgb(255, 153, 204);

// ============================================================================
// UI Colors
// ============================================================================

/// Title and accents
pub const NYAN_MAGENTA: Color = Color::Magenta;

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(110, 110, 110);

/// Running state
pub const RUNNING_GREEN: Color = Color::Rgb(120, 230, 120);

/// Rainbow band for a trail cell counted from the sprite
pub fn rainbow_band(distance: usize) -> Color {
    RAINBOW[distance % RAINBOW.len()]
}

/// Style for the title row
pub fn title_style() -> Style {
    Style::default()
        .fg(NYAN_MAGENTA)
        .add_modifier(Modifier::BOLD)
}

/// Style for secondary text
pub fn dim_style() -> Style {
    Style::default().fg(DIM_GRAY)
}
