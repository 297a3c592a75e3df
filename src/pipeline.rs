//! Pipeline – ties together asset loading, layout, rendering and document
//! storage into a single call.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};

use crate::assets::{load_photo, CardImages, LogoCache};
use crate::card::CardLayout;
use crate::documents::DocumentDir;
use crate::error::RenderError;
use crate::layout::layout_card;
use crate::record::AthleteRecord;
use crate::render::render_pdf;

/// Synchronous core: images + record → (PDF bytes, layout).
pub fn generate_card(
    record: &AthleteRecord,
    images: &CardImages,
    today: NaiveDate,
) -> Result<(Vec<u8>, CardLayout), RenderError> {
    let photo = images.photo.as_ref().map(|p| p.info());
    let layout = layout_card(record, photo, images.logo.is_some(), today);
    let bytes = render_pdf(&layout, images)?;
    Ok((bytes, layout))
}

/// Renders a record's card and stores it, returning the logical location
/// (`/idcards/<file>`).
#[async_trait]
pub trait CardRenderer: Send + Sync {
    async fn render(&self, record: &AthleteRecord) -> Result<String, RenderError>;
}

/// The production renderer: built-in Helvetica, printpdf, files on disk.
#[derive(Debug, Clone)]
pub struct PdfCardRenderer {
    docs: DocumentDir,
    uploads_dir: PathBuf,
    logo: LogoCache,
}

impl PdfCardRenderer {
    pub fn new(docs: DocumentDir, uploads_dir: impl Into<PathBuf>, logo: LogoCache) -> Self {
        Self {
            docs,
            uploads_dir: uploads_dir.into(),
            logo,
        }
    }

    pub fn documents(&self) -> &DocumentDir {
        &self.docs
    }

    /// Gather the photo and logo for `record`. Failures are logged and the
    /// card is drawn without the affected image.
    pub async fn load_images(&self, record: &AthleteRecord) -> CardImages {
        let photo = match record.profile.profile_photo.as_deref() {
            Some(reference) => match load_photo(&self.uploads_dir, reference).await {
                Ok(img) => Some(img),
                Err(e) => {
                    log::warn!(
                        "Photo for {} unavailable, using placeholder: {e}",
                        record.display_id
                    );
                    None
                }
            },
            None => None,
        };
        CardImages {
            photo,
            logo: self.logo.load().await,
        }
    }

    /// Lay out the card as it would be rendered today, without writing it.
    pub async fn layout(&self, record: &AthleteRecord) -> CardLayout {
        let images = self.load_images(record).await;
        let photo = images.photo.as_ref().map(|p| p.info());
        layout_card(record, photo, images.logo.is_some(), Local::now().date_naive())
    }
}

#[async_trait]
impl CardRenderer for PdfCardRenderer {
    async fn render(&self, record: &AthleteRecord) -> Result<String, RenderError> {
        let images = self.load_images(record).await;
        let today = Local::now().date_naive();

        // PDF serialisation is CPU-bound; keep it off the async workers.
        let owned = record.clone();
        let (bytes, layout) =
            tokio::task::spawn_blocking(move || generate_card(&owned, &images, today)).await??;
        if layout.overflowed {
            log::warn!(
                "Card for {} did not fit; detail column truncated",
                record.display_id
            );
        }

        let location = self
            .docs
            .write_unique(&record.display_id, Utc::now().timestamp_millis(), &bytes)
            .await?;
        log::info!("ID card for {} written to {location}", record.display_id);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_bytes;
    use crate::record::DisplayId;
    use crate::samples;

    fn renderer(root: &std::path::Path) -> PdfCardRenderer {
        PdfCardRenderer::new(
            DocumentDir::new(root.join("idcards")),
            root.join("uploads"),
            LogoCache::new(root.join("assets/logo.png"), None).unwrap(),
        )
    }

    #[test]
    fn generate_card_basic() {
        let rec = AthleteRecord::new(samples::long_profile(), DisplayId::from("PS20269999"), Utc::now());
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let (bytes, layout) = generate_card(&rec, &CardImages::default(), today).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
        assert!(!layout.ops.is_empty());
    }

    #[tokio::test]
    async fn render_writes_pdf_file() {
        let tmp = tempfile::tempdir().unwrap();
        let r = renderer(tmp.path());
        let rec = AthleteRecord::new(samples::short_profile(), DisplayId::from("PS20260100"), Utc::now());
        let loc = r.render(&rec).await.unwrap();
        assert!(loc.starts_with("/idcards/idcard_PS20260100_"));
        assert!(loc.ends_with(".pdf"));
        let bytes = r.documents().read(&loc).await.unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[tokio::test]
    async fn broken_photo_falls_back_to_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let r = renderer(tmp.path());
        let rec = AthleteRecord::new(
            samples::profile_with_photo("uploads/missing.png"),
            DisplayId::from("PS20260101"),
            Utc::now(),
        );
        let layout = r.layout(&rec).await;
        assert!(layout.texts().any(|t| t.text == "NO PHOTO"));
        assert!(r.render(&rec).await.is_ok());
    }

    #[tokio::test]
    async fn uploaded_photo_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("uploads")).unwrap();
        std::fs::write(tmp.path().join("uploads/me.png"), png_bytes(30, 30)).unwrap();
        let r = renderer(tmp.path());
        let rec = AthleteRecord::new(
            samples::profile_with_photo("uploads/me.png"),
            DisplayId::from("PS20260102"),
            Utc::now(),
        );
        let layout = r.layout(&rec).await;
        assert!(layout.uses_image(crate::card::ImageKey::Photo));
        assert!(!layout.texts().any(|t| t.text == "NO PHOTO"));
    }

    #[tokio::test]
    async fn unwritable_output_is_render_error() {
        let tmp = tempfile::tempdir().unwrap();
        // A file where the output directory should be.
        let blocker = tmp.path().join("idcards");
        std::fs::write(&blocker, b"x").unwrap();
        let r = renderer(tmp.path());
        let rec = AthleteRecord::new(samples::short_profile(), DisplayId::from("PS20260103"), Utc::now());
        let err = r.render(&rec).await.unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
        assert!(err.to_string().starts_with("Failed to generate ID card"));
    }
}
