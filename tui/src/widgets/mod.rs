//! Widgets for the panel

pub mod track;

pub use track::TrackWidget;

use unicode_width::UnicodeWidthChar;

/// Cut `text` to at most `width` terminal cells, marking the cut with `…`
pub fn fit_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    let total: usize = text.chars().filter_map(UnicodeWidthChar::width).sum();
    if total <= width {
        return text.to_string();
    }
    if width == 0 {
        return out;
    }

    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('\u{2026}');
    out
}
