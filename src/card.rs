//! Card layout – the intermediate representation between the layout engine
//! and the PDF renderer. This is the "frozen" structure that encodes exactly
//! what goes on the card, in paint order.
//!
//! Coordinates are in points with the origin at the top-left of the canvas;
//! the renderer flips them into PDF space.

use serde::{Deserialize, Serialize};

/// Canvas width in points.
pub const CARD_WIDTH: f32 = 650.0;
/// Canvas height in points.
pub const CARD_HEIGHT: f32 = 400.0;

/// A complete card ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardLayout {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub width: f32,
    pub height: f32,
    /// Body font size chosen for the right-hand detail column.
    pub detail_font_size: f32,
    /// True when the detail column ran out of room and was cut short.
    pub overflowed: bool,
    /// Draw operations in paint order.
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub const WHITE: Color = Color::rgb8(0xff, 0xff, 0xff);
    pub const BRAND: Color = Color::rgb8(0x2a, 0x52, 0x98);
    pub const BRAND_DARK: Color = Color::rgb8(0x1e, 0x3c, 0x72);
    pub const SUBTITLE: Color = Color::rgb8(0xe0, 0xe7, 0xef);
    pub const BODY: Color = Color::rgb8(0x22, 0x22, 0x22);
    pub const MUTED: Color = Color::rgb8(0x33, 0x33, 0x33);
    pub const PLACEHOLDER: Color = Color::rgb8(0xcc, 0xcc, 0xcc);
    pub const PLACEHOLDER_TEXT: Color = Color::rgb8(0x66, 0x66, 0x66);
    pub const WARNING: Color = Color::rgb8(0xb9, 0x1c, 0x1c);
    pub const SIGNATURE: Color = Color::rgb8(0xb3, 0xd1, 0xff);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
}

/// Built-in Helvetica faces used on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    Regular,
    Bold,
    Oblique,
}

/// Images the layout may reference. The renderer resolves each key to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKey {
    Photo,
    Logo,
}

/// One positioned line of text. `x` is already alignment-adjusted; `y` is
/// the top of the line box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub face: Face,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    /// Axis-aligned rectangle, optionally with rounded corners.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: Stroke,
    },
    Text(TextRun),
    /// Image scaled into the given box, optionally clipped to a circle and
    /// painted with reduced opacity.
    Image {
        key: ImageKey,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        clip: Option<ClipCircle>,
        opacity: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipCircle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

impl CardLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
            detail_font_size: 0.0,
            overflowed: false,
            ops: Vec::new(),
        }
    }

    /// All text runs in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(t) => Some(t),
            _ => None,
        })
    }

    /// True if any image op references `key`.
    pub fn uses_image(&self, key: ImageKey) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, DrawOp::Image { key: k, .. } if *k == key))
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
