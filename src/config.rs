//! Service configuration.
//!
//! Every field has a working default; [`ServiceConfig::from_env`] overrides
//! them from environment variables (the binary loads `.env` first).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_LOGO_URL: &str =
    "https://cdn.pixabay.com/photo/2016/03/31/19/14/wheelchair-1294828_1280.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Directory rendered cards are written to (served as `/idcards`).
    pub output_dir: PathBuf,
    /// Directory profile photo references are resolved against.
    pub uploads_dir: PathBuf,
    /// Local path of the cached logo.
    pub logo_path: PathBuf,
    /// Where to fetch the logo from when it is not cached. `None` disables it.
    pub logo_url: Option<String>,
    pub retention: Duration,
    pub sweep_interval: Duration,
    /// Mail relay endpoint. `None` means email is not configured.
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub sender_email: String,
    pub mail_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("idcards"),
            uploads_dir: PathBuf::from("uploads"),
            logo_path: PathBuf::from("assets/logo.png"),
            logo_url: Some(DEFAULT_LOGO_URL.to_string()),
            retention: Duration::from_secs(30 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            mail_api_url: None,
            mail_api_key: None,
            sender_email: "noreply@parasports.org".to_string(),
            mail_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

impl ServiceConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let nonempty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = nonempty("IDCARD_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Some(v) = nonempty("IDCARD_UPLOADS_DIR") {
            cfg.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = nonempty("IDCARD_LOGO_PATH") {
            cfg.logo_path = PathBuf::from(v);
        }
        // Set but empty disables the download.
        if let Some(v) = lookup("IDCARD_LOGO_URL") {
            cfg.logo_url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = nonempty("IDCARD_RETENTION_DAYS") {
            cfg.retention = Duration::from_secs(parse_u64("IDCARD_RETENTION_DAYS", &v)? * 86_400);
        }
        if let Some(v) = nonempty("IDCARD_SWEEP_INTERVAL_HOURS") {
            let hours = parse_u64("IDCARD_SWEEP_INTERVAL_HOURS", &v)?;
            if hours == 0 {
                return Err(ConfigError::InvalidNumber {
                    name: "IDCARD_SWEEP_INTERVAL_HOURS",
                    value: v,
                });
            }
            cfg.sweep_interval = Duration::from_secs(hours * 3_600);
        }
        cfg.mail_api_url = nonempty("MAIL_API_URL");
        cfg.mail_api_key = nonempty("MAIL_API_KEY");
        if let Some(v) = nonempty("SENDER_EMAIL") {
            cfg.sender_email = v;
        }
        if let Some(v) = nonempty("MAIL_TIMEOUT_SECS") {
            cfg.mail_timeout = Duration::from_secs(parse_u64("MAIL_TIMEOUT_SECS", &v)?);
        }
        Ok(cfg)
    }

    /// Scratch configuration rooted at `dir` with network access disabled.
    /// Used by the CLI `--dir` option and tests.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            output_dir: dir.join("idcards"),
            uploads_dir: dir.join("uploads"),
            logo_path: dir.join("assets/logo.png"),
            logo_url: None,
            ..Self::default()
        }
    }
}
