//! Card layout engine – turns an athlete record into the ordered draw list
//! of a fixed 650×400 card.
//!
//! The engine is pure: photo loading, logo availability and the issue date
//! are decided by the caller, so the same inputs always give the same
//! [`CardLayout`].

use chrono::NaiveDate;

use crate::card::*;
use crate::fonts::{centered_x, text_width, wrap_text};
use crate::record::{format_dmy, AthleteRecord};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

const FRAME_INSET: f32 = 10.0;
const FRAME_WIDTH: f32 = CARD_WIDTH - 2.0 * FRAME_INSET;
const FRAME_HEIGHT: f32 = CARD_HEIGHT - 2.0 * FRAME_INSET;
const FRAME_RADIUS: f32 = 18.0;

const HEADER_HEIGHT: f32 = 60.0;
const FOOTER_HEIGHT: f32 = 40.0;
const FOOTER_TOP: f32 = CARD_HEIGHT - 50.0;

const PHOTO_X: f32 = 30.0;
const PHOTO_Y: f32 = 75.0;
const PHOTO_SIZE: f32 = 100.0;

const LEFT_X: f32 = 30.0;
const LEFT_Y: f32 = 185.0;
const LEFT_WIDTH: f32 = 120.0;
const NAME_SIZE: f32 = 15.0;
const NAME_ADVANCE: f32 = 18.0;
const NAME_MAX_LINES: usize = 2;
const LEFT_SIZE: f32 = 10.0;
const LEFT_ADVANCE: f32 = 13.0;

const DETAIL_X: f32 = 170.0;
const DETAIL_Y: f32 = 80.0;
/// Bottom of the detail column: footer top minus room for the fallback line.
pub const DETAIL_MAX_Y: f32 = FOOTER_TOP - 12.0;
const HEADER_SIZE: f32 = 12.0;
const HEADER_ADVANCE: f32 = 18.0;
const SUBHEADER_ADVANCE: f32 = 14.0;
const LINE_ADVANCE: f32 = 15.0;
const SECTION_GAP: f32 = 5.0;
const FALLBACK_SIZE: f32 = 9.0;
pub const FALLBACK_TEXT: &str = "See full details online";

/// Body size of the detail column for ordinary records.
pub const DEFAULT_DETAIL_SIZE: f32 = 10.0;
/// Body size once the detail content exceeds [`COMPACT_THRESHOLD`].
pub const COMPACT_DETAIL_SIZE: f32 = 9.0;
/// Character count above which the detail column switches to the compact size.
pub const COMPACT_THRESHOLD: usize = 180;

// Per-field character budgets.
const SPORT_BUDGET: usize = 30;
const COACH_NAME_BUDGET: usize = 30;
const COACH_CONTACT_BUDGET: usize = 20;
const DISABILITY_TYPE_BUDGET: usize = 30;
const CLASSIFICATION_BUDGET: usize = 20;
const EMERGENCY_BUDGET: usize = 40;
const PHONE_BUDGET: usize = 20;
/// Characters per wrapped address line.
pub const ADDRESS_LINE_CHARS: usize = 60;
const ADDRESS_MAX_LINES: usize = 2;

/// Ellipsis marker appended to truncated values.
pub const ELLIPSIS: char = '\u{2026}';

/// Pixel size of an already-decoded profile photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoInfo {
    pub px_width: u32,
    pub px_height: u32,
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Cut `s` to at most `max` characters, ending in an ellipsis when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Wrap the single-line address into at most two lines of
/// [`ADDRESS_LINE_CHARS`]. The first line is a hard cut; the second carries
/// the remainder, ellipsized when it is still too long.
pub fn wrap_address(full: &str) -> Vec<String> {
    let chars: Vec<char> = full.chars().collect();
    let mut lines = Vec::with_capacity(ADDRESS_MAX_LINES);
    let mut start = 0;
    while start < chars.len() && lines.len() < ADDRESS_MAX_LINES {
        let last = lines.len() + 1 == ADDRESS_MAX_LINES;
        let line = if last {
            let rest: String = chars[start..].iter().collect();
            truncate(&rest, ADDRESS_LINE_CHARS)
        } else {
            let end = (start + ADDRESS_LINE_CHARS).min(chars.len());
            chars[start..end].iter().collect()
        };
        lines.push(line);
        start += ADDRESS_LINE_CHARS;
    }
    lines
}

/// Characters the detail column has to show, used to pick its font size.
pub fn detail_content_len(record: &AthleteRecord) -> usize {
    let p = &record.profile;
    let len = |s: &str| s.chars().count();
    let opt = |s: &Option<String>| s.as_deref().map(len).unwrap_or(0);
    len(p.primary_sport.as_str())
        + opt(&p.coach_name)
        + opt(&p.coach_contact)
        + len(p.disability_type.as_str())
        + len(&p.disability_classification)
        + p.address.content_len()
        + len(&p.emergency_contact.name)
        + len(&p.emergency_contact.relationship)
        + len(&p.emergency_contact.phone)
}

/// Body font size of the detail column.
pub fn detail_font_size(record: &AthleteRecord) -> f32 {
    if detail_content_len(record) > COMPACT_THRESHOLD {
        COMPACT_DETAIL_SIZE
    } else {
        DEFAULT_DETAIL_SIZE
    }
}

/// Shorten `text` with an ellipsis until it fits `max_width`.
fn ellipsize_to_width(text: &str, font_size: f32, face: Face, max_width: f32) -> String {
    if text_width(text, font_size, face) <= max_width {
        return text.to_string();
    }
    let mut n = text.chars().count();
    while n > 1 {
        let candidate = truncate(text, n);
        if text_width(&candidate, font_size, face) <= max_width {
            return candidate;
        }
        n -= 1;
    }
    ELLIPSIS.to_string()
}

fn text(text: impl Into<String>, x: f32, y: f32, font_size: f32, face: Face, color: Color) -> DrawOp {
    DrawOp::Text(TextRun {
        text: text.into(),
        x,
        y,
        font_size,
        face,
        color,
    })
}

fn centered(
    s: impl Into<String>,
    x: f32,
    width: f32,
    y: f32,
    font_size: f32,
    face: Face,
    color: Color,
) -> DrawOp {
    let s = s.into();
    let cx = centered_x(&s, font_size, face, x, width);
    text(s, cx, y, font_size, face, color)
}

// ---------------------------------------------------------------------------
// Detail column
// ---------------------------------------------------------------------------

/// Vertical cursor for the right-hand column. Once a line would cross
/// `max_y` a single fallback line is emitted and every later append is a
/// no-op.
#[derive(Debug)]
pub struct DetailColumn {
    x: f32,
    y: f32,
    max_y: f32,
    font_size: f32,
    overflowed: bool,
    ops: Vec<DrawOp>,
}

impl DetailColumn {
    pub fn new(x: f32, y: f32, max_y: f32, font_size: f32) -> Self {
        Self {
            x,
            y,
            max_y,
            font_size,
            overflowed: false,
            ops: Vec::new(),
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn cursor(&self) -> f32 {
        self.y
    }

    /// Reserve `advance` points, or switch to overflow mode.
    fn reserve(&mut self, advance: f32) -> bool {
        if self.overflowed {
            return false;
        }
        if self.y + advance > self.max_y {
            self.overflowed = true;
            self.ops.push(text(
                FALLBACK_TEXT,
                self.x,
                self.y,
                FALLBACK_SIZE,
                Face::Oblique,
                Color::WARNING,
            ));
            return false;
        }
        true
    }

    /// Section heading, 12pt bold.
    pub fn header(&mut self, label: &str) {
        if self.reserve(HEADER_ADVANCE) {
            self.ops
                .push(text(label, self.x, self.y, HEADER_SIZE, Face::Bold, Color::BRAND));
            self.y += HEADER_ADVANCE;
        }
    }

    /// Bold heading at body size, for nested sections.
    pub fn subheader(&mut self, label: &str) {
        if self.reserve(SUBHEADER_ADVANCE) {
            self.ops
                .push(text(label, self.x, self.y, self.font_size, Face::Bold, Color::BRAND));
            self.y += SUBHEADER_ADVANCE;
        }
    }

    /// One body line.
    pub fn line(&mut self, s: impl Into<String>) {
        if self.reserve(LINE_ADVANCE) {
            self.ops.push(text(
                s,
                self.x,
                self.y,
                self.font_size,
                Face::Regular,
                Color::BODY,
            ));
            self.y += LINE_ADVANCE;
        }
    }

    /// Blank space between sections. Never triggers overflow by itself.
    pub fn gap(&mut self, h: f32) {
        if !self.overflowed {
            self.y += h;
        }
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }
}

// ---------------------------------------------------------------------------
// Card sections
// ---------------------------------------------------------------------------

fn frame(ops: &mut Vec<DrawOp>) {
    ops.push(DrawOp::Rect {
        x: 0.0,
        y: 0.0,
        width: CARD_WIDTH,
        height: CARD_HEIGHT,
        radius: 0.0,
        fill: Some(Color::WHITE),
        stroke: None,
    });
    ops.push(DrawOp::Rect {
        x: FRAME_INSET,
        y: FRAME_INSET,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        radius: FRAME_RADIUS,
        fill: None,
        stroke: Some(Stroke {
            width: 4.0,
            color: Color::BRAND,
        }),
    });
}

fn header(ops: &mut Vec<DrawOp>, logo: bool) {
    ops.push(DrawOp::Rect {
        x: FRAME_INSET,
        y: FRAME_INSET,
        width: FRAME_WIDTH,
        height: HEADER_HEIGHT,
        radius: 0.0,
        fill: Some(Color::BRAND),
        stroke: None,
    });
    if logo {
        ops.push(DrawOp::Image {
            key: ImageKey::Logo,
            x: 28.0,
            y: 18.0,
            width: 44.0,
            height: 44.0,
            clip: None,
            opacity: 1.0,
        });
    }
    ops.push(text("PARA SPORTS ID CARD", 90.0, 22.0, 26.0, Face::Bold, Color::WHITE));
    ops.push(text(
        "Official Player Identification",
        90.0,
        48.0,
        12.0,
        Face::Regular,
        Color::SUBTITLE,
    ));
}

fn watermark(ops: &mut Vec<DrawOp>) {
    ops.push(DrawOp::Image {
        key: ImageKey::Logo,
        x: 325.0,
        y: 120.0,
        width: 300.0,
        height: 200.0,
        clip: None,
        opacity: 0.07,
    });
}

fn photo(ops: &mut Vec<DrawOp>, photo: Option<PhotoInfo>) {
    let cx = PHOTO_X + PHOTO_SIZE / 2.0;
    let cy = PHOTO_Y + PHOTO_SIZE / 2.0;
    let r = PHOTO_SIZE / 2.0;

    ops.push(DrawOp::Circle {
        cx,
        cy,
        r: r + 6.0,
        fill: Some(Color::WHITE),
        stroke: None,
    });

    match photo {
        Some(info) if info.px_width > 0 && info.px_height > 0 => {
            // Cover: scale so the short side fills the box, centre the rest.
            let (w, h) = (info.px_width as f32, info.px_height as f32);
            let scale = (PHOTO_SIZE / w).max(PHOTO_SIZE / h);
            let (dw, dh) = (w * scale, h * scale);
            ops.push(DrawOp::Image {
                key: ImageKey::Photo,
                x: cx - dw / 2.0,
                y: cy - dh / 2.0,
                width: dw,
                height: dh,
                clip: Some(ClipCircle { cx, cy, r }),
                opacity: 1.0,
            });
        }
        _ => {
            ops.push(DrawOp::Circle {
                cx,
                cy,
                r,
                fill: Some(Color::PLACEHOLDER),
                stroke: None,
            });
            ops.push(centered(
                "NO PHOTO",
                PHOTO_X,
                PHOTO_SIZE,
                cy - 10.0,
                12.0,
                Face::Bold,
                Color::PLACEHOLDER_TEXT,
            ));
        }
    }

    ops.push(DrawOp::Circle {
        cx,
        cy,
        r: r + 2.0,
        fill: None,
        stroke: Some(Stroke {
            width: 2.0,
            color: Color::BRAND,
        }),
    });
}

fn identity(ops: &mut Vec<DrawOp>, record: &AthleteRecord, today: NaiveDate) {
    let mut y = LEFT_Y;

    let mut name_lines = wrap_text(&record.full_name(), NAME_SIZE, Face::Bold, LEFT_WIDTH);
    if name_lines.len() > NAME_MAX_LINES {
        let rest = name_lines[NAME_MAX_LINES - 1..].join(" ");
        name_lines.truncate(NAME_MAX_LINES - 1);
        name_lines.push(rest);
    }
    for line in name_lines {
        let line = ellipsize_to_width(&line, NAME_SIZE, Face::Bold, LEFT_WIDTH);
        ops.push(centered(
            line,
            LEFT_X,
            LEFT_WIDTH,
            y,
            NAME_SIZE,
            Face::Bold,
            Color::BRAND_DARK,
        ));
        y += NAME_ADVANCE;
    }

    let dob = record.profile.date_of_birth;
    let rows = [
        format!("Player ID: {}", record.display_id),
        format!("Gender: {}", record.profile.gender.as_str()),
        format!("DOB: {}", format_dmy(dob)),
        format!("Age: {}", record.age_on(today)),
    ];
    for row in rows {
        ops.push(centered(
            row,
            LEFT_X,
            LEFT_WIDTH,
            y,
            LEFT_SIZE,
            Face::Regular,
            Color::MUTED,
        ));
        y += LEFT_ADVANCE;
    }
}

fn details(record: &AthleteRecord, font_size: f32) -> DetailColumn {
    let p = &record.profile;
    let mut col = DetailColumn::new(DETAIL_X, DETAIL_Y, DETAIL_MAX_Y, font_size);

    col.header("Primary Sport");
    col.line(truncate(p.primary_sport.as_str(), SPORT_BUDGET));
    if let Some(secondary) = p.secondary_sport {
        col.line(format!(
            "Secondary: {}",
            truncate(secondary.as_str(), SPORT_BUDGET)
        ));
    }
    col.line(format!(
        "Level: {} ({} yrs)",
        p.experience_level.as_str(),
        p.years_of_experience
    ));

    if p.coach_name.is_some() || p.coach_contact.is_some() {
        col.subheader("Coach");
        if let Some(name) = &p.coach_name {
            col.line(format!("Name: {}", truncate(name, COACH_NAME_BUDGET)));
        }
        if let Some(contact) = &p.coach_contact {
            col.line(format!("Contact: {}", truncate(contact, COACH_CONTACT_BUDGET)));
        }
    }
    col.gap(SECTION_GAP);

    col.header("Disability");
    col.line(format!(
        "Type: {}",
        truncate(p.disability_type.as_str(), DISABILITY_TYPE_BUDGET)
    ));
    col.line(format!(
        "Class: {}",
        truncate(&p.disability_classification, CLASSIFICATION_BUDGET)
    ));

    col.header("Address");
    for line in wrap_address(&p.address.full()) {
        col.line(line);
    }

    col.header("Emergency");
    let ec = &p.emergency_contact;
    col.line(truncate(
        &format!("{} ({})", ec.name, ec.relationship),
        EMERGENCY_BUDGET,
    ));
    col.line(format!("Phone: {}", truncate(&ec.phone, PHONE_BUDGET)));

    col
}

fn footer(ops: &mut Vec<DrawOp>, issued: NaiveDate) {
    ops.push(DrawOp::Rect {
        x: FRAME_INSET,
        y: FOOTER_TOP,
        width: FRAME_WIDTH,
        height: FOOTER_HEIGHT,
        radius: 0.0,
        fill: Some(Color::BRAND),
        stroke: None,
    });
    ops.push(text(
        format!("Issued: {}", format_dmy(issued)),
        20.0,
        CARD_HEIGHT - 40.0,
        10.0,
        Face::Regular,
        Color::WHITE,
    ));
    ops.push(centered(
        "This is an official Para Sports ID Card",
        0.0,
        CARD_WIDTH,
        CARD_HEIGHT - 28.0,
        10.0,
        Face::Bold,
        Color::WHITE,
    ));
    ops.push(centered(
        "Valid for official Para Sports events and competitions",
        0.0,
        CARD_WIDTH,
        CARD_HEIGHT - 15.0,
        8.0,
        Face::Regular,
        Color::WHITE,
    ));
    ops.push(DrawOp::Line {
        x1: 480.0,
        y1: CARD_HEIGHT - 20.0,
        x2: 620.0,
        y2: CARD_HEIGHT - 20.0,
        stroke: Stroke {
            width: 1.0,
            color: Color::SIGNATURE,
        },
    });
    ops.push(centered(
        "Authorized Signature",
        480.0,
        140.0,
        CARD_HEIGHT - 18.0,
        10.0,
        Face::Regular,
        Color::SIGNATURE,
    ));
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out the ID card for `record`.
///
/// `photo` is `None` when the record has no photo or it could not be loaded;
/// the placeholder avatar is drawn instead. `logo` says whether the logo
/// image will be available to the renderer. `today` is the issue date and the
/// reference for the age shown on the card.
pub fn layout_card(
    record: &AthleteRecord,
    photo_info: Option<PhotoInfo>,
    logo: bool,
    today: NaiveDate,
) -> CardLayout {
    let mut card = CardLayout::new(format!("Para Sports ID Card - {}", record.full_name()));
    let font_size = detail_font_size(record);

    frame(&mut card.ops);
    header(&mut card.ops, logo);
    if logo {
        watermark(&mut card.ops);
    }
    photo(&mut card.ops, photo_info);
    identity(&mut card.ops, record, today);

    let col = details(record, font_size);
    card.overflowed = col.overflowed();
    card.detail_font_size = font_size;
    card.ops.extend(col.into_ops());

    footer(&mut card.ops, today);
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Address, DisplayId};
    use crate::samples;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn record(profile: crate::record::NewAthlete) -> AthleteRecord {
        AthleteRecord::new(profile, DisplayId::from("PS20261234"), Utc::now())
    }

    fn has_text(card: &CardLayout, needle: &str) -> bool {
        card.texts().any(|t| t.text == needle)
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("Wheelchair", 20), "Wheelchair");
        assert_eq!(truncate("abcdefghij", 5), "abcd\u{2026}");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("Zoë Ångström", 12), "Zoë Ångström");
    }

    #[test]
    fn address_of_40_chars_is_one_line() {
        let s = "a".repeat(40);
        assert_eq!(wrap_address(&s), vec![s.clone()]);
    }

    #[test]
    fn address_of_125_chars_is_two_lines_second_ellipsized() {
        let address = Address {
            street: "x".repeat(91),
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "India Republic".into(),
        };
        let full = address.full();
        assert_eq!(full.chars().count(), 125);

        let lines = wrap_address(&full);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), ADDRESS_LINE_CHARS);
        assert_eq!(lines[1].chars().count(), ADDRESS_LINE_CHARS);
        assert!(lines[1].ends_with(ELLIPSIS));
    }

    #[test]
    fn address_remainder_that_fits_is_not_ellipsized() {
        let s = "b".repeat(100);
        let lines = wrap_address(&s);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "b".repeat(40));
    }

    #[test]
    fn short_record_keeps_default_font_size() {
        let r = record(samples::short_profile());
        assert!(detail_content_len(&r) <= COMPACT_THRESHOLD);
        assert_eq!(detail_font_size(&r), DEFAULT_DETAIL_SIZE);
    }

    #[test]
    fn long_record_downgrades_font_size() {
        let r = record(samples::long_profile());
        assert!(detail_content_len(&r) > COMPACT_THRESHOLD);
        let card = layout_card(&r, None, false, today());
        assert!(card.detail_font_size < DEFAULT_DETAIL_SIZE);
        assert_eq!(card.detail_font_size, COMPACT_DETAIL_SIZE);
    }

    #[test]
    fn font_size_is_stable_for_same_input() {
        let r = record(samples::long_profile());
        let a = layout_card(&r, None, false, today());
        let b = layout_card(&r, None, false, today());
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let mut p = samples::short_profile();
        let r = record(p.clone());
        let missing = COMPACT_THRESHOLD - detail_content_len(&r);
        p.disability_classification.push_str(&"z".repeat(missing));
        let r = record(p.clone());
        assert_eq!(detail_content_len(&r), COMPACT_THRESHOLD);
        assert_eq!(detail_font_size(&r), DEFAULT_DETAIL_SIZE);
        p.disability_classification.push('z');
        assert_eq!(detail_font_size(&record(p)), COMPACT_DETAIL_SIZE);
    }

    #[test]
    fn no_photo_draws_placeholder() {
        let card = layout_card(&record(samples::short_profile()), None, false, today());
        assert!(has_text(&card, "NO PHOTO"));
        assert!(!card.uses_image(ImageKey::Photo));
    }

    #[test]
    fn photo_is_clipped_to_circle_and_covers_box() {
        let info = PhotoInfo {
            px_width: 400,
            px_height: 200,
        };
        let card = layout_card(&record(samples::short_profile()), Some(info), false, today());
        assert!(!has_text(&card, "NO PHOTO"));
        let img = card
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Image {
                    key: ImageKey::Photo,
                    width,
                    height,
                    clip,
                    ..
                } => Some((*width, *height, *clip)),
                _ => None,
            })
            .expect("photo op");
        assert_eq!(img.0, 200.0);
        assert_eq!(img.1, 100.0);
        assert_eq!(img.2.map(|c| c.r), Some(50.0));
    }

    #[test]
    fn logo_and_watermark_only_when_available() {
        let r = record(samples::short_profile());
        let without = layout_card(&r, None, false, today());
        assert!(!without.uses_image(ImageKey::Logo));

        let with = layout_card(&r, None, true, today());
        let logos: Vec<f32> = with
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image {
                    key: ImageKey::Logo,
                    opacity,
                    ..
                } => Some(*opacity),
                _ => None,
            })
            .collect();
        assert_eq!(logos, vec![1.0, 0.07]);
    }

    #[test]
    fn coach_section_is_conditional() {
        let short = layout_card(&record(samples::short_profile()), None, false, today());
        assert!(!has_text(&short, "Coach"));

        let mut p = samples::short_profile();
        p.coach_contact = Some("+91 90000 00000".into());
        let with_contact = layout_card(&record(p), None, false, today());
        assert!(has_text(&with_contact, "Coach"));
        assert!(has_text(&with_contact, "Contact: +91 90000 00000"));
        assert!(!with_contact.texts().any(|t| t.text.starts_with("Name: ")));
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let card = layout_card(&record(samples::long_profile()), None, false, today());
        let order: Vec<&str> = card
            .texts()
            .map(|t| t.text.as_str())
            .filter(|t| {
                ["Primary Sport", "Coach", "Disability", "Address", "Emergency"].contains(t)
            })
            .collect();
        assert_eq!(
            order,
            vec!["Primary Sport", "Coach", "Disability", "Address", "Emergency"]
        );
    }

    #[test]
    fn long_fields_are_truncated_to_budget() {
        let card = layout_card(&record(samples::long_profile()), None, false, today());
        let coach = card
            .texts()
            .find(|t| t.text.starts_with("Name: "))
            .expect("coach name");
        assert_eq!(coach.text.chars().count(), "Name: ".len() + COACH_NAME_BUDGET);
        assert!(coach.text.ends_with(ELLIPSIS));
    }

    #[test]
    fn left_column_shows_identity() {
        let r = record(samples::short_profile());
        let card = layout_card(&r, None, false, today());
        assert!(has_text(&card, "Asha Patel"));
        assert!(has_text(&card, "Player ID: PS20261234"));
        assert!(has_text(&card, "Gender: Female"));
        assert!(has_text(&card, "DOB: 12/04/1998"));
        assert!(has_text(&card, "Age: 28"));
        assert!(has_text(&card, "Issued: 17/10/2026"));
    }

    #[test]
    fn long_name_wraps_to_two_centered_lines() {
        let card = layout_card(&record(samples::long_profile()), None, false, today());
        let names: Vec<&TextRun> = card
            .texts()
            .filter(|t| t.font_size == NAME_SIZE && t.color == Color::BRAND_DARK)
            .collect();
        assert_eq!(names.len(), NAME_MAX_LINES);
        for n in names {
            assert!(n.x >= LEFT_X);
            assert!(text_width(&n.text, NAME_SIZE, Face::Bold) <= LEFT_WIDTH);
        }
    }

    #[test]
    fn regular_records_do_not_overflow() {
        for p in [samples::short_profile(), samples::long_profile()] {
            let card = layout_card(&record(p), None, true, today());
            assert!(!card.overflowed);
            assert!(!has_text(&card, FALLBACK_TEXT));
            for t in card.texts().filter(|t| t.x == DETAIL_X && t.y < FOOTER_TOP) {
                assert!(t.y + LINE_ADVANCE <= DETAIL_MAX_Y + 1e-3, "{:?}", t);
            }
        }
    }

    #[test]
    fn column_overflow_emits_single_fallback() {
        let mut col = DetailColumn::new(DETAIL_X, DETAIL_Y, 140.0, DEFAULT_DETAIL_SIZE);
        col.header("Primary Sport"); // 80 → 98
        col.line("one"); // → 113
        col.line("two"); // → 128
        assert!(!col.overflowed());
        col.line("three"); // 128 + 15 > 140
        assert!(col.overflowed());
        let y_at_overflow = col.cursor();
        col.header("Disability");
        col.line("four");
        col.gap(SECTION_GAP);
        assert_eq!(col.cursor(), y_at_overflow);

        let ops = col.into_ops();
        let texts: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Primary Sport", "one", "two", FALLBACK_TEXT]);
    }

    #[test]
    fn line_ending_exactly_at_limit_fits() {
        let mut col = DetailColumn::new(0.0, 0.0, LINE_ADVANCE, DEFAULT_DETAIL_SIZE);
        col.line("fits");
        assert!(!col.overflowed());
        col.line("does not");
        assert!(col.overflowed());
    }

    #[test]
    fn all_ops_inside_canvas() {
        let card = layout_card(&record(samples::long_profile()), None, true, today());
        for t in card.texts() {
            assert!(t.x >= 0.0 && t.x < CARD_WIDTH, "{:?}", t);
            assert!(t.y >= 0.0 && t.y < CARD_HEIGHT, "{:?}", t);
        }
    }
}
