//! Text measurement for the built-in Helvetica faces.
//!
//! The card is rendered with the PDF base-14 Helvetica family, so no font
//! file is embedded. Advance widths below are the standard Helvetica AFM
//! metrics (units per em = 1000) for printable ASCII; anything else falls
//! back to an average glyph width.

use crate::card::Face;

const UNITS_PER_EM: f32 = 1000.0;

/// Ascender height as a fraction of the font size, used to place baselines.
pub const ASCENT: f32 = 0.75;

/// Fallback advance for glyphs outside printable ASCII.
const FALLBACK_ADVANCE: u16 = 556;

/// Advance of the horizontal ellipsis, which truncated fields end with.
const ELLIPSIS_ADVANCE: u16 = 1000;

#[rustfmt::skip]
const REGULAR: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn advance(ch: char, face: Face) -> u16 {
    let table = match face {
        Face::Bold => &BOLD,
        Face::Regular | Face::Oblique => &REGULAR,
    };
    match ch {
        ' '..='~' => table[ch as usize - 0x20],
        '\u{2026}' => ELLIPSIS_ADVANCE,
        _ => FALLBACK_ADVANCE,
    }
}

/// Width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32, face: Face) -> f32 {
    let units: u32 = text.chars().map(|c| advance(c, face) as u32).sum();
    units as f32 * font_size / UNITS_PER_EM
}

/// X offset that centres `text` inside a box of `box_width` starting at `x`.
pub fn centered_x(text: &str, font_size: f32, face: Face, x: f32, box_width: f32) -> f32 {
    let w = text_width(text, font_size, face);
    x + ((box_width - w) / 2.0).max(0.0)
}

/// Word-wrap text to fit within `max_width` points. Returns a vec of lines.
/// A single word wider than `max_width` is kept on its own line.
pub fn wrap_text(text: &str, font_size: f32, face: Face, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();
    for word in text.split_whitespace() {
        let candidate = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current_line, word)
        };
        if text_width(&candidate, font_size, face) > max_width && !current_line.is_empty() {
            lines.push(current_line);
            current_line = word.to_string();
        } else {
            current_line = candidate;
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
