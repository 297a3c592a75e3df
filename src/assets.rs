//! Card assets: the profile photo and the cached organisation logo.
//!
//! Both are best-effort. Every failure is returned as an [`AssetError`] so
//! the caller can log it and render without the image.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::AssetError;
use crate::layout::PhotoInfo;

/// Encoded image bytes together with their decoded pixel size.
#[derive(Debug, Clone)]
pub struct CardImage {
    pub bytes: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

impl CardImage {
    /// Decode `bytes` just far enough to learn the pixel dimensions.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, AssetError> {
        let img = image::load_from_memory(&bytes)?;
        Ok(Self {
            px_width: img.width(),
            px_height: img.height(),
            bytes,
        })
    }

    pub fn info(&self) -> PhotoInfo {
        PhotoInfo {
            px_width: self.px_width,
            px_height: self.px_height,
        }
    }
}

/// Images handed to the renderer. `None` means "draw without it".
#[derive(Debug, Clone, Default)]
pub struct CardImages {
    pub photo: Option<CardImage>,
    pub logo: Option<CardImage>,
}

// ---------------------------------------------------------------------------
// Photo
// ---------------------------------------------------------------------------

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>, AssetError> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| AssetError::DataUri("missing `data:` scheme".to_string()))?;
    let (header, data) = rest.split_once(',').ok_or_else(|| {
        AssetError::DataUri("missing `,` separator between header and data".to_string())
    })?;
    if !header.contains(";base64") {
        return Err(AssetError::DataUri(
            "only base64-encoded data URIs are supported".to_string(),
        ));
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| AssetError::DataUri(format!("base64 decode error: {e}")))
}

/// Map a stored photo reference to a file under `uploads_dir`.
///
/// References are stored relative to the uploads directory, optionally with
/// a leading `/` or `uploads/`. Anything that would leave the directory is
/// rejected.
pub fn resolve_upload(uploads_dir: &Path, reference: &str) -> Result<PathBuf, AssetError> {
    let trimmed = reference.trim_start_matches('/');
    let relative = trimmed.strip_prefix("uploads/").unwrap_or(trimmed);
    if relative.is_empty() {
        return Err(AssetError::UnsafePath(reference.to_string()));
    }
    let rel = Path::new(relative);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(AssetError::UnsafePath(reference.to_string()));
    }
    Ok(uploads_dir.join(rel))
}

/// Load and decode the profile photo named by `reference`.
pub async fn load_photo(uploads_dir: &Path, reference: &str) -> Result<CardImage, AssetError> {
    let bytes = if reference.starts_with("data:") {
        parse_data_uri(reference)?
    } else {
        let path = resolve_upload(uploads_dir, reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| AssetError::Io { path, source })?
    };
    CardImage::decode(bytes)
}

// ---------------------------------------------------------------------------
// Logo
// ---------------------------------------------------------------------------

/// How long a failed logo download is remembered before trying again.
pub const LOGO_RETRY_AFTER: Duration = Duration::from_secs(15 * 60);

/// Local copy of the organisation logo, downloaded on first use.
///
/// Concurrent first uses may both download; each writes a private temp file
/// and renames it into place, so the cached file is never partial. After a
/// failed download, renders skip the logo until [`LOGO_RETRY_AFTER`] passes.
#[derive(Debug, Clone)]
pub struct LogoCache {
    path: PathBuf,
    url: Option<String>,
    client: reqwest::Client,
    failed_until: Arc<Mutex<Option<Instant>>>,
}

impl LogoCache {
    pub fn new(path: impl Into<PathBuf>, url: Option<String>) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            path: path.into(),
            url: url.filter(|u| !u.trim().is_empty()),
            client,
            failed_until: Arc::new(Mutex::new(None)),
        })
    }

    fn retry_at(&self) -> Option<Instant> {
        match self.failed_until.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_retry_at(&self, at: Option<Instant>) {
        match self.failed_until.lock() {
            Ok(mut guard) => *guard = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the logo exists locally and return its path.
    pub async fn ensure(&self) -> Result<&Path, AssetError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(&self.path);
        }
        let url = self.url.as_deref().ok_or(AssetError::LogoDisabled)?;
        if let Some(at) = self.retry_at() {
            if Instant::now() < at {
                return Err(AssetError::RetryLater);
            }
        }
        match self.download(url).await {
            Ok(()) => {
                self.set_retry_at(None);
                Ok(&self.path)
            }
            Err(e) => {
                self.set_retry_at(Some(Instant::now() + LOGO_RETRY_AFTER));
                Err(e)
            }
        }
    }

    async fn download(&self, url: &str) -> Result<(), AssetError> {
        log::info!("Downloading logo from {url}");

        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(AssetError::DownloadStatus(resp.status().as_u16()));
        }
        let bytes = resp.bytes().await?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| AssetError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| AssetError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| AssetError::Io {
                path: self.path.clone(),
                source,
            })?;
        log::info!("Logo cached at {}", self.path.display());
        Ok(())
    }

    /// Logo image for a render, or `None` with a warning when unavailable.
    pub async fn load(&self) -> Option<CardImage> {
        let result: Result<CardImage, AssetError> = async {
            let path = self.ensure().await?;
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| AssetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            CardImage::decode(bytes)
        }
        .await;
        match result {
            Ok(img) => Some(img),
            Err(AssetError::LogoDisabled) => {
                log::debug!("Logo disabled, rendering without it");
                None
            }
            Err(AssetError::RetryLater) => {
                log::debug!("Logo download failed recently, rendering without it");
                None
            }
            Err(e) => {
                log::warn!("Logo unavailable: {e}");
                None
            }
        }
    }
}
