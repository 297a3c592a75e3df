//! Flat directory of rendered ID card PDFs.
//!
//! Files are named `idcard_<displayId>_<unixMillis>.pdf` and exposed to the
//! rest of the system by their logical location `/idcards/<filename>`. The
//! renderer only ever creates files here and the retention sweeper only ever
//! deletes them, so no locking is needed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::io::AsyncWriteExt;

use crate::record::DisplayId;

/// Prefix of every logical document location.
pub const LOCATION_PREFIX: &str = "/idcards/";

/// How many timestamp bumps to try before giving up on a unique name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Metadata of one stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct DocumentDir {
    root: PathBuf,
}

pub fn file_name(display_id: &DisplayId, millis: i64) -> String {
    format!("idcard_{display_id}_{millis}.pdf")
}

/// File name shown to users downloading or receiving the card.
pub fn download_name(display_id: &DisplayId) -> String {
    format!("Para_Sports_ID_Card_{display_id}.pdf")
}

impl DocumentDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed. Safe to call before every write.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Write `bytes` under a fresh name for `display_id` and return the
    /// logical location. If the timestamped name is taken the timestamp is
    /// bumped until a free one is found.
    pub async fn write_unique(
        &self,
        display_id: &DisplayId,
        millis: i64,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        self.ensure().await?;
        let mut stamp = millis;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = file_name(display_id, stamp);
            let path = self.root.join(&name);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
                    return Ok(format!("{LOCATION_PREFIX}{name}"));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e),
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free file name for {display_id} near {millis}"),
        ))
    }

    /// Map a logical location back to a file in this directory. Returns
    /// `None` for locations that are not plain `/idcards/<file>` names.
    pub fn resolve(&self, location: &str) -> Option<PathBuf> {
        let name = location.strip_prefix(LOCATION_PREFIX)?;
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." || name == "." {
            return None;
        }
        Some(self.root.join(name))
    }

    pub async fn read(&self, location: &str) -> std::io::Result<Vec<u8>> {
        let path = self.resolve(location).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a document location: {location:?}"),
            )
        })?;
        tokio::fs::read(path).await
    }

    /// Regular files in the directory with their modification times. Entries
    /// that cannot be inspected are returned as errors alongside the good
    /// ones so a caller can log them and carry on.
    pub async fn list(
        &self,
    ) -> std::io::Result<Vec<Result<DocumentEntry, (PathBuf, std::io::Error)>>> {
        let mut out = Vec::new();
        let mut rd = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => match meta.modified() {
                    Ok(modified) => out.push(Ok(DocumentEntry {
                        path,
                        modified,
                        len: meta.len(),
                    })),
                    Err(e) => out.push(Err((path, e))),
                },
                Ok(_) => {}
                Err(e) => out.push(Err((path, e))),
            }
        }
        sort_listing(&mut out);
        Ok(out)
    }
}

/// Order a listing by path, failed entries included.
fn sort_listing(entries: &mut [Result<DocumentEntry, (PathBuf, std::io::Error)>]) {
    entries.sort_by(|a, b| listed_path(a).cmp(listed_path(b)));
}

fn listed_path(entry: &Result<DocumentEntry, (PathBuf, std::io::Error)>) -> &Path {
    match entry {
        Ok(e) => &e.path,
        Err((p, _)) => p,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_dir_and_returns_location() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = DocumentDir::new(tmp.path().join("nested/idcards"));
        let id = DisplayId::from("PS20260007");
        let loc = docs.write_unique(&id, 1_700_000_000_000, b"%PDF-1.7").await.unwrap();
        assert_eq!(loc, "/idcards/idcard_PS20260007_1700000000000.pdf");
        assert_eq!(docs.read(&loc).await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn collision_bumps_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = DocumentDir::new(tmp.path());
        let id = DisplayId::from("PS20260007");
        let a = docs.write_unique(&id, 42, b"a").await.unwrap();
        let b = docs.write_unique(&id, 42, b"b").await.unwrap();
        let c = docs.write_unique(&id, 42, b"c").await.unwrap();
        assert_eq!(a, "/idcards/idcard_PS20260007_42.pdf");
        assert_eq!(b, "/idcards/idcard_PS20260007_43.pdf");
        assert_eq!(c, "/idcards/idcard_PS20260007_44.pdf");
        assert_eq!(docs.read(&a).await.unwrap(), b"a");
    }

    #[test]
    fn resolve_rejects_foreign_locations() {
        let docs = DocumentDir::new("/data/idcards");
        assert_eq!(
            docs.resolve("/idcards/idcard_x_1.pdf"),
            Some(PathBuf::from("/data/idcards/idcard_x_1.pdf"))
        );
        assert_eq!(docs.resolve("/idcards/../secret"), None);
        assert_eq!(docs.resolve("/idcards/.."), None);
        assert_eq!(docs.resolve("/uploads/a.png"), None);
        assert_eq!(docs.resolve("/idcards/"), None);
    }

    #[tokio::test]
    async fn list_skips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.pdf"), b"1").unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"22").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let docs = DocumentDir::new(tmp.path());
        let entries: Vec<DocumentEntry> = docs
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].path.ends_with("a.pdf"));
        assert_eq!(entries[0].len, 2);
    }

    #[test]
    fn listing_with_failed_entries_sorts_by_path() {
        // Interleave failures with good entries in reverse order.
        let mut entries: Vec<Result<DocumentEntry, (PathBuf, std::io::Error)>> = (0..60)
            .rev()
            .map(|i| {
                let path = PathBuf::from(format!("/docs/idcard_{i:03}.pdf"));
                if i % 3 == 0 {
                    Err((path, std::io::Error::from(std::io::ErrorKind::NotFound)))
                } else {
                    Ok(DocumentEntry {
                        path,
                        modified: SystemTime::UNIX_EPOCH,
                        len: i,
                    })
                }
            })
            .collect();
        sort_listing(&mut entries);

        let paths: Vec<&Path> = entries.iter().map(listed_path).collect();
        let mut expected = paths.clone();
        expected.sort();
        assert_eq!(paths, expected);
        assert_eq!(paths[0], Path::new("/docs/idcard_000.pdf"));
        assert!(entries[0].is_err());
        assert_eq!(entries.iter().filter(|e| e.is_err()).count(), 20);
    }

    #[test]
    fn names() {
        let id = DisplayId::from("PS20261111");
        assert_eq!(file_name(&id, 5), "idcard_PS20261111_5.pdf");
        assert_eq!(download_name(&id), "Para_Sports_ID_Card_PS20261111.pdf");
    }
}
