//! PDF renderer – takes a [`CardLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use std::collections::HashMap;

use printpdf::*;

use crate::assets::{CardImage, CardImages};
use crate::card::{self, CardLayout, ClipCircle, DrawOp, Face, ImageKey, TextRun};
use crate::error::RenderError;
use crate::fonts::ASCENT;

const PT_TO_MM: f32 = 0.352778;

/// Control-point distance for a quarter circle drawn as a cubic bezier.
const KAPPA: f32 = 0.552_284_8;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a card layout into the bytes of a single-page PDF.
///
/// Image ops whose key has no entry in `images`, or whose bytes printpdf
/// cannot embed, are skipped with a `log::warn`.
pub fn render_pdf(layout: &CardLayout, images: &CardImages) -> Result<Vec<u8>, RenderError> {
    if !(layout.width > 0.0 && layout.height > 0.0) {
        return Err(RenderError::Pdf(format!(
            "invalid canvas {}x{}",
            layout.width, layout.height
        )));
    }
    let page_w = Mm(layout.width * PT_TO_MM);
    let page_h = Mm(layout.height * PT_TO_MM);

    let mut doc = PdfDocument::new(&layout.title);

    // ── Pre-register images and opacity states ────────────────────────────
    let mut resources: HashMap<ImageKey, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();
    for (key, img) in [
        (ImageKey::Photo, images.photo.as_ref()),
        (ImageKey::Logo, images.logo.as_ref()),
    ] {
        let Some(img) = img else { continue };
        if !layout.uses_image(key) {
            continue;
        }
        if let Some(res) = register_image(&mut doc, key, img, &mut img_warnings) {
            resources.insert(key, res);
        }
    }

    let mut alpha_states: HashMap<u32, ExtendedGraphicsStateId> = HashMap::new();
    for op in &layout.ops {
        if let DrawOp::Image { opacity, .. } = op {
            if *opacity < 1.0 {
                alpha_states.entry(opacity.to_bits()).or_insert_with(|| {
                    doc.add_graphics_state(
                        ExtendedGraphicsState::default().with_current_fill_alpha(*opacity),
                    )
                });
            }
        }
    }

    // ── Draw ──────────────────────────────────────────────────────────────
    let canvas = Canvas {
        page_height: layout.height,
        images: &resources,
        alpha_states: &alpha_states,
    };
    let mut ops = Vec::new();
    for op in &layout.ops {
        canvas.draw(&mut ops, op);
    }

    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    log::debug!(
        "Rendered {:?}: {} ops, {} bytes",
        layout.title,
        layout.ops.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn register_image(
    doc: &mut PdfDocument,
    key: ImageKey,
    img: &CardImage,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<ImageResource> {
    match RawImage::decode_from_bytes(&img.bytes, warnings) {
        Ok(raw) => Some(ImageResource {
            xobj_id: doc.add_image(&raw),
            px_width: img.px_width,
            px_height: img.px_height,
        }),
        Err(e) => {
            log::warn!("Skipping {key:?} image, PDF encode error: {e}");
            None
        }
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn pdf_color(c: card::Color) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

fn builtin(face: Face) -> BuiltinFont {
    match face {
        Face::Regular => BuiltinFont::Helvetica,
        Face::Bold => BuiltinFont::HelveticaBold,
        Face::Oblique => BuiltinFont::HelveticaOblique,
    }
}

/// Page state shared by every draw call. Layout coordinates have their
/// origin at the top-left; PDF space is bottom-left.
struct Canvas<'a> {
    page_height: f32,
    images: &'a HashMap<ImageKey, ImageResource>,
    alpha_states: &'a HashMap<u32, ExtendedGraphicsStateId>,
}

impl Canvas<'_> {
    fn point(&self, x: f32, y: f32, bezier: bool) -> LinePoint {
        LinePoint {
            p: Point {
                x: Pt(x),
                y: Pt(self.page_height - y),
            },
            bezier,
        }
    }

    /// Closed outline of a rectangle with corner radius `r` (0 for square).
    fn rect_ring(&self, x: f32, y: f32, w: f32, h: f32, r: f32) -> PolygonRing {
        let r = r.clamp(0.0, w.min(h) / 2.0);
        if r == 0.0 {
            return PolygonRing {
                points: vec![
                    self.point(x, y, false),
                    self.point(x + w, y, false),
                    self.point(x + w, y + h, false),
                    self.point(x, y + h, false),
                ],
            };
        }
        let k = r * KAPPA;
        let (x2, y2) = (x + w, y + h);
        PolygonRing {
            points: vec![
                self.point(x + r, y, false),
                self.point(x2 - r, y, false),
                self.point(x2 - r + k, y, true),
                self.point(x2, y + r - k, true),
                self.point(x2, y + r, false),
                self.point(x2, y2 - r, false),
                self.point(x2, y2 - r + k, true),
                self.point(x2 - r + k, y2, true),
                self.point(x2 - r, y2, false),
                self.point(x + r, y2, false),
                self.point(x + r - k, y2, true),
                self.point(x, y2 - r + k, true),
                self.point(x, y2 - r, false),
                self.point(x, y + r, false),
                self.point(x, y + r - k, true),
                self.point(x + r - k, y, true),
                self.point(x + r, y, false),
            ],
        }
    }

    /// Circle as four cubic bezier quarters.
    fn circle_ring(&self, cx: f32, cy: f32, r: f32) -> PolygonRing {
        let k = r * KAPPA;
        PolygonRing {
            points: vec![
                self.point(cx + r, cy, false),
                self.point(cx + r, cy + k, true),
                self.point(cx + k, cy + r, true),
                self.point(cx, cy + r, false),
                self.point(cx - k, cy + r, true),
                self.point(cx - r, cy + k, true),
                self.point(cx - r, cy, false),
                self.point(cx - r, cy - k, true),
                self.point(cx - k, cy - r, true),
                self.point(cx, cy - r, false),
                self.point(cx + k, cy - r, true),
                self.point(cx + r, cy - k, true),
                self.point(cx + r, cy, false),
            ],
        }
    }

    fn paint(
        &self,
        ops: &mut Vec<Op>,
        ring: PolygonRing,
        fill: Option<card::Color>,
        stroke: Option<card::Stroke>,
    ) {
        if let Some(fill) = fill {
            ops.push(Op::SetFillColor {
                col: pdf_color(fill),
            });
        }
        if let Some(stroke) = stroke {
            ops.push(Op::SetOutlineColor {
                col: pdf_color(stroke.color),
            });
            ops.push(Op::SetOutlineThickness {
                pt: Pt(stroke.width),
            });
        }
        let mode = match (fill.is_some(), stroke.is_some()) {
            (true, true) => PaintMode::FillStroke,
            (true, false) => PaintMode::Fill,
            (false, true) => PaintMode::Stroke,
            (false, false) => return,
        };
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![ring],
                mode,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn draw(&self, ops: &mut Vec<Op>, op: &DrawOp) {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                radius,
                fill,
                stroke,
            } => {
                let ring = self.rect_ring(*x, *y, *width, *height, *radius);
                self.paint(ops, ring, *fill, *stroke);
            }
            DrawOp::Circle {
                cx,
                cy,
                r,
                fill,
                stroke,
            } => {
                let ring = self.circle_ring(*cx, *cy, *r);
                self.paint(ops, ring, *fill, *stroke);
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
            } => {
                ops.push(Op::SetOutlineColor {
                    col: pdf_color(stroke.color),
                });
                ops.push(Op::SetOutlineThickness {
                    pt: Pt(stroke.width),
                });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![self.point(*x1, *y1, false), self.point(*x2, *y2, false)],
                        is_closed: false,
                    },
                });
            }
            DrawOp::Text(run) => self.text(ops, run),
            DrawOp::Image {
                key,
                x,
                y,
                width,
                height,
                clip,
                opacity,
            } => self.image(ops, *key, *x, *y, *width, *height, *clip, *opacity),
        }
    }

    fn text(&self, ops: &mut Vec<Op>, run: &TextRun) {
        if run.text.is_empty() {
            return;
        }
        let font = builtin(run.face);
        // Baseline ≈ top of line + ascender.
        let baseline = self.page_height - run.y - run.font_size * ASCENT;

        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(run.x),
                y: Pt(baseline),
            },
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(run.font_size),
            font,
        });
        ops.push(Op::SetFillColor {
            col: pdf_color(run.color),
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winlatin(&run.text))],
            font,
        });
        ops.push(Op::EndTextSection);
    }

    #[allow(clippy::too_many_arguments)]
    fn image(
        &self,
        ops: &mut Vec<Op>,
        key: ImageKey,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        clip: Option<ClipCircle>,
        opacity: f32,
    ) {
        let Some(res) = self.images.get(&key) else {
            return;
        };

        ops.push(Op::SaveGraphicsState);
        if let Some(c) = clip {
            ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![self.circle_ring(c.cx, c.cy, c.r)],
                    mode: PaintMode::Clip,
                    winding_order: WindingOrder::NonZero,
                },
            });
        }
        if let Some(gs) = self.alpha_states.get(&opacity.to_bits()) {
            ops.push(Op::LoadGraphicsState { gs: gs.clone() });
        }

        // At dpi=72 printpdf renders 1 px = 1 pt, so
        // scale = desired_pt / px_dim.
        let scale_x = if res.px_width > 0 {
            width / res.px_width as f32
        } else {
            1.0
        };
        let scale_y = if res.px_height > 0 {
            height / res.px_height as f32
        } else {
            1.0
        };
        ops.push(Op::UseXobject {
            id: res.xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(self.page_height - y - height)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
        ops.push(Op::RestoreGraphicsState);
    }
}
