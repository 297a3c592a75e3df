//! Error taxonomy for the card pipeline.
//!
//! Each stage owns one error type. Only [`RenderError`] (through
//! `regenerate`) and [`ServiceError`] ever reach a request handler; the rest
//! end at the delivery worker or the sweeper and are logged there.

use std::path::PathBuf;

use thiserror::Error;

/// A registration payload failed a required-field, format or range check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(String),

    #[error("please enter a valid email: {0:?}")]
    InvalidEmail(String),

    #[error("date of birth {0} is in the future")]
    BirthDateInFuture(chrono::NaiveDate),

    #[error("{field} failed the {code} check")]
    Invalid { field: String, code: String },
}

/// Layout or document-writing failure. Wraps the underlying cause.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to generate ID card: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to generate ID card: PDF serialisation failed: {0}")]
    Pdf(String),

    #[error("Failed to generate ID card: render task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A decorative or photo asset could not be obtained. Never fatal.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("logo download disabled")]
    LogoDisabled,

    #[error("logo download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("logo download returned HTTP {0}")]
    DownloadStatus(u16),

    #[error("logo download failed recently; not retrying yet")]
    RetryLater,

    #[error("asset I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("photo reference {0:?} escapes the uploads directory")]
    UnsafePath(String),

    #[error("invalid data URI: {0}")]
    DataUri(String),

    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
}

/// The email carrying the card could not be sent.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("ID card file not found: {0}")]
    MissingDocument(PathBuf),

    #[error("failed to read ID card {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay rejected message (HTTP {status}): {details}")]
    Rejected { status: u16, details: String },
}

/// Per-file failure during a retention sweep.
#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("cannot list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Record store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Player not found")]
    NotFound,

    #[error("Player with this email already exists")]
    DuplicateEmail,

    #[error("could not allocate a unique display id")]
    DuplicateDisplayId,

    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { expected: u64, found: u64 },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("card cannot be marked sent before it is generated")]
    InvalidTransition,
}

/// Configuration could not be read from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Failure of a synchronous [`crate::service::CardService`] call.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Player not found")]
    RecordNotFound,

    #[error("ID card not generated yet")]
    CardNotGenerated,

    #[error("ID card file {0} no longer exists")]
    DocumentMissing(PathBuf),

    #[error("delivery queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServiceError::RecordNotFound,
            other => ServiceError::Store(other),
        }
    }
}
