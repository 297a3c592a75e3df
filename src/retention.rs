//! Retention sweeper: deletes rendered cards once they pass the retention
//! window.

use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::documents::DocumentDir;
use crate::error::RetentionError;

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    docs: DocumentDir,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(docs: DocumentDir, max_age: Duration, interval: Duration) -> Self {
        Self {
            docs,
            max_age,
            interval,
        }
    }

    /// True if a file last modified at `modified` is past retention at `now`.
    /// A file exactly `max_age` old is kept.
    pub fn is_expired(&self, modified: SystemTime, now: SystemTime) -> bool {
        now.duration_since(modified)
            .map(|age| age > self.max_age)
            .unwrap_or(false)
    }

    /// Sweep once against the current time.
    pub async fn sweep(&self) -> Result<SweepReport, RetentionError> {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep once as if the time were `now`. Only a failure to list the
    /// directory is returned; per-file failures are logged and counted.
    pub async fn sweep_at(&self, now: SystemTime) -> Result<SweepReport, RetentionError> {
        let root = self.docs.root();
        let entries = match self.docs.list().await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Retention: {} does not exist yet", root.display());
                return Ok(SweepReport::default());
            }
            Err(source) => {
                return Err(RetentionError::List {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        let mut report = SweepReport::default();
        for entry in entries {
            report.scanned += 1;
            let entry = match entry {
                Ok(entry) => entry,
                Err((path, source)) => {
                    log::warn!("{}", RetentionError::Stat { path, source });
                    report.failed += 1;
                    continue;
                }
            };
            if !self.is_expired(entry.modified, now) {
                continue;
            }
            match tokio::fs::remove_file(&entry.path).await {
                Ok(()) => {
                    log::info!("Deleted old ID card: {}", entry.path.display());
                    report.deleted += 1;
                }
                Err(source) => {
                    log::warn!(
                        "{}",
                        RetentionError::Delete {
                            path: entry.path,
                            source
                        }
                    );
                    report.failed += 1;
                }
            }
        }
        log::info!(
            "Retention sweep of {}: scanned {}, deleted {}, failed {}",
            root.display(),
            report.scanned,
            report.deleted,
            report.failed
        );
        Ok(report)
    }

    /// Run [`sweep`](Self::sweep) every interval on a background task. The
    /// first sweep happens immediately.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    log::error!("Retention sweep failed: {e}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const DAY: u64 = 24 * 60 * 60;

    fn touch(dir: &std::path::Path, name: &str, modified: SystemTime) {
        let f = File::create(dir.join(name)).unwrap();
        f.set_modified(modified).unwrap();
    }

    #[tokio::test]
    async fn deletes_only_files_strictly_older_than_window() {
        let tmp = tempfile::tempdir().unwrap();
        // Whole seconds so mtimes round-trip exactly on every filesystem.
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        touch(tmp.path(), "old.pdf", now - Duration::from_secs(31 * DAY));
        touch(tmp.path(), "edge.pdf", now - Duration::from_secs(30 * DAY));
        touch(tmp.path(), "new.pdf", now - Duration::from_secs(29 * DAY));

        let sweeper = RetentionSweeper::new(
            DocumentDir::new(tmp.path()),
            DEFAULT_RETENTION,
            DEFAULT_INTERVAL,
        );
        let report = sweeper.sweep_at(now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                scanned: 3,
                deleted: 1,
                failed: 0
            }
        );
        assert!(!tmp.path().join("old.pdf").exists());
        assert!(tmp.path().join("edge.pdf").exists());
        assert!(tmp.path().join("new.pdf").exists());
    }

    #[tokio::test]
    async fn missing_directory_is_empty_sweep() {
        let tmp = tempfile::tempdir().unwrap();
        let sweeper = RetentionSweeper::new(
            DocumentDir::new(tmp.path().join("never-created")),
            DEFAULT_RETENTION,
            DEFAULT_INTERVAL,
        );
        assert_eq!(sweeper.sweep().await.unwrap(), SweepReport::default());
    }

    #[tokio::test]
    async fn subdirectories_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        let sweeper = RetentionSweeper::new(
            DocumentDir::new(tmp.path()),
            Duration::ZERO,
            DEFAULT_INTERVAL,
        );
        let far_future = SystemTime::now() + Duration::from_secs(365 * DAY);
        let report = sweeper.sweep_at(far_future).await.unwrap();
        assert_eq!(report.scanned, 0);
        assert!(tmp.path().join("nested").exists());
    }

    #[test]
    fn future_mtime_is_not_expired() {
        let sweeper = RetentionSweeper::new(
            DocumentDir::new("/unused"),
            DEFAULT_RETENTION,
            DEFAULT_INTERVAL,
        );
        let now = SystemTime::now();
        assert!(!sweeper.is_expired(now + Duration::from_secs(60), now));
    }
}
