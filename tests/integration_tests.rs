//! Integration tests for the ID card pipeline.
//!
//! These tests validate:
//! - Card layouts are deterministic and stay inside the canvas
//! - PDF output exists and has valid format
//! - Delivery runs in the background and records its outcome
//! - Regenerated and swept documents behave as downloads expect

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

use idcard_forge::assets::CardImages;
use idcard_forge::card::{CardLayout, DrawOp, ImageKey, CARD_HEIGHT, CARD_WIDTH};
use idcard_forge::config::ServiceConfig;
use idcard_forge::delivery::{DeliveryState, DeliveryWorker};
use idcard_forge::error::ServiceError;
use idcard_forge::layout::{layout_card, FALLBACK_TEXT};
use idcard_forge::record::{AthleteRecord, DisplayId};
use idcard_forge::render::render_pdf;
use idcard_forge::samples;
use idcard_forge::store::{InMemoryStore, RecordStore};
use idcard_forge::{generate_card, CardService};

// =====================================================================
// Helpers
// =====================================================================

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn record(profile: idcard_forge::NewAthlete) -> AthleteRecord {
    AthleteRecord::new(profile, DisplayId::from("PS20265555"), Utc::now())
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn digest(layout: &CardLayout) -> String {
    let hash = Sha256::digest(layout.to_json().as_bytes());
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([200, 120, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn local_service(tmp: &tempfile::TempDir) -> (CardService, DeliveryWorker, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let (svc, worker) =
        CardService::from_config(ServiceConfig::local(tmp.path()), store.clone()).unwrap();
    (svc, worker, store)
}

// =====================================================================
// Layout
// =====================================================================

#[test]
fn layout_is_deterministic() {
    for profile in [samples::short_profile(), samples::long_profile()] {
        let rec = record(profile);
        let a = layout_card(&rec, None, true, today());
        let b = layout_card(&rec, None, true, today());
        assert_eq!(digest(&a), digest(&b));
    }
}

#[test]
fn layout_differs_with_photo() {
    let rec = record(samples::short_profile());
    let without = layout_card(&rec, None, false, today());
    let with = layout_card(
        &rec,
        Some(idcard_forge::layout::PhotoInfo {
            px_width: 100,
            px_height: 100,
        }),
        false,
        today(),
    );
    assert_ne!(digest(&without), digest(&with));
}

#[test]
fn layout_shapes_stay_inside_canvas() {
    let rec = record(samples::long_profile());
    let layout = layout_card(&rec, None, true, today());
    assert_eq!((layout.width, layout.height), (CARD_WIDTH, CARD_HEIGHT));
    for op in &layout.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                ..
            } => {
                assert!(*x >= 0.0 && *y >= 0.0);
                assert!(x + width <= CARD_WIDTH && y + height <= CARD_HEIGHT);
            }
            DrawOp::Circle { cx, cy, r, .. } => {
                assert!(cx - r >= 0.0 && cy - r >= 0.0);
                assert!(cx + r <= CARD_WIDTH && cy + r <= CARD_HEIGHT);
            }
            DrawOp::Image {
                key: ImageKey::Logo,
                x,
                y,
                width,
                height,
                ..
            } => {
                assert!(x + width <= CARD_WIDTH && y + height <= CARD_HEIGHT);
            }
            _ => {}
        }
    }
}

#[test]
fn sample_records_show_full_details() {
    for profile in [samples::short_profile(), samples::long_profile()] {
        let layout = layout_card(&record(profile), None, false, today());
        assert!(!layout.overflowed);
        assert!(!layout.texts().any(|t| t.text == FALLBACK_TEXT));
        assert!(layout.texts().any(|t| t.text.contains("PS20265555")));
    }
}

#[test]
fn layout_json_roundtrip_renders() {
    let rec = record(samples::short_profile());
    let layout = layout_card(&rec, None, false, today());
    let parsed = CardLayout::from_json(&layout.to_json()).unwrap();
    assert_eq!(parsed, layout);
    assert_valid_pdf(&render_pdf(&parsed, &CardImages::default()).unwrap());
}

// =====================================================================
// PDF generation
// =====================================================================

#[test]
fn generate_card_for_each_sample() {
    for profile in [samples::short_profile(), samples::long_profile()] {
        let (bytes, layout) =
            generate_card(&record(profile), &CardImages::default(), today()).unwrap();
        assert_valid_pdf(&bytes);
        assert!(!layout.overflowed);
    }
}

#[test]
fn pdf_output_is_stable_in_size() {
    let rec = record(samples::short_profile());
    let (bytes1, _) = generate_card(&rec, &CardImages::default(), today()).unwrap();
    let (bytes2, _) = generate_card(&rec, &CardImages::default(), today()).unwrap();

    // printpdf embeds timestamps and ids, so byte-exact equality isn't
    // guaranteed.
    let diff = (bytes1.len() as i64 - bytes2.len() as i64).unsigned_abs();
    assert!(
        diff < 200,
        "PDF outputs differ significantly: {} vs {} bytes",
        bytes1.len(),
        bytes2.len()
    );
}

// =====================================================================
// Service end to end
// =====================================================================

#[tokio::test]
async fn registration_renders_card_without_mail_relay() {
    let tmp = tempfile::tempdir().unwrap();
    let (svc, worker, store) = local_service(&tmp);

    let rec = svc.register(samples::short_profile()).await.unwrap();
    svc.shutdown();
    let summary = worker.join().await;
    assert_eq!(summary.notify_failed, 1);

    let stored = store.find_by_display_id(&rec.display_id).await.unwrap().unwrap();
    assert!(stored.card.generated);
    assert!(!stored.card.sent);
    let doc = svc.document(&rec.display_id).await.unwrap();
    assert_valid_pdf(&doc.bytes);
    assert_eq!(Some(doc.location), stored.card.location);
}

#[tokio::test]
async fn uploaded_and_inline_photos_are_embedded() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("uploads")).unwrap();
    std::fs::write(tmp.path().join("uploads/face.png"), png(60, 80)).unwrap();
    let (svc, _worker, store) = local_service(&tmp);

    let on_disk = store
        .create(samples::profile_with_photo("/uploads/face.png"))
        .await
        .unwrap();
    let mut inline = samples::long_profile();
    inline.profile_photo = Some(format!(
        "data:image/png;base64,{}",
        BASE64_STD.encode(png(20, 20))
    ));
    let inline = store.create(inline).await.unwrap();

    for rec in [on_disk, inline] {
        svc.regenerate(&rec.display_id).await.unwrap();
        let doc = svc.document(&rec.display_id).await.unwrap();
        assert_valid_pdf(&doc.bytes);
        // The placeholder caption is not drawn when a photo loads.
        let plain = generate_card(&rec, &CardImages::default(), today()).unwrap().0;
        assert!(doc.bytes.len() > plain.len());
    }
}

#[tokio::test]
async fn regenerate_repoints_and_keeps_old_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (svc, _worker, store) = local_service(&tmp);
    let rec = store.create(samples::short_profile()).await.unwrap();

    let mut locations = Vec::new();
    for _ in 0..3 {
        locations.push(svc.regenerate(&rec.display_id).await.unwrap());
    }
    locations.dedup();
    assert_eq!(locations.len(), 3);

    let stored = store.find_by_display_id(&rec.display_id).await.unwrap().unwrap();
    assert_eq!(stored.card.location.as_ref(), locations.last());
    let files = std::fs::read_dir(tmp.path().join("idcards")).unwrap().count();
    assert_eq!(files, 3);
}

#[tokio::test]
async fn sweep_then_download_reports_missing_document() {
    let tmp = tempfile::tempdir().unwrap();
    let (svc, _worker, store) = local_service(&tmp);
    let rec = store.create(samples::short_profile()).await.unwrap();
    svc.regenerate(&rec.display_id).await.unwrap();

    let later = SystemTime::now() + Duration::from_secs(31 * 24 * 60 * 60);
    let report = svc.sweeper().sweep_at(later).await.unwrap();
    assert_eq!(report.deleted, 1);

    // The record still claims a card; the download reports the gap.
    let stored = store.find_by_display_id(&rec.display_id).await.unwrap().unwrap();
    assert!(stored.card.generated);
    assert!(matches!(
        svc.document(&rec.display_id).await,
        Err(ServiceError::DocumentMissing(_))
    ));

    // Regenerating heals it.
    svc.regenerate(&rec.display_id).await.unwrap();
    assert_valid_pdf(&svc.document(&rec.display_id).await.unwrap().bytes);
}

#[tokio::test]
async fn send_without_relay_is_notify_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let (svc, _worker, store) = local_service(&tmp);
    let rec = store.create(samples::short_profile()).await.unwrap();
    svc.regenerate(&rec.display_id).await.unwrap();
    assert_eq!(
        svc.send(&rec.display_id).await.unwrap(),
        DeliveryState::NotifyFailed
    );
}
