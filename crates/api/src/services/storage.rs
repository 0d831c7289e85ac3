//! Evidence file storage on the local filesystem.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Longest extension kept from an uploaded file name.
const MAX_EXTENSION_LENGTH: usize = 8;

/// Directory holding uploaded evidence files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Where a stored file lives. `name` must have passed [`is_safe_name`].
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write an upload under `name`, creating the directory on first use.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn save(&self, name: &str, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_of(name), contents).await
    }

    /// Best-effort removal after a failed metadata insert.
    pub async fn discard(&self, name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.path_of(name)).await {
            tracing::warn!(file = %name, error = %e, "Failed to remove orphaned upload");
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Name an upload is stored under: a fresh UUID plus the original extension
/// when that extension is short and alphanumeric.
#[must_use]
pub fn stored_name(original: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match original.and_then(extension) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LENGTH
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether a requested file name stays inside the upload directory.
#[must_use]
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_keeps_short_extension() {
        let name = stored_name(Some("Packet Photo.JPG"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn test_stored_name_drops_odd_extensions() {
        assert_eq!(stored_name(Some("scan.tar-gz")).len(), 36);
        assert_eq!(stored_name(Some("report.verylongext")).len(), 36);
        assert_eq!(stored_name(Some(".bashrc")).len(), 36);
        assert_eq!(stored_name(Some("noext")).len(), 36);
        assert_eq!(stored_name(None).len(), 36);
    }

    #[test]
    fn test_safe_names() {
        assert!(is_safe_name("0b6f3c9e-1d2a-4c5b-8e7f-9a0b1c2d3e4f.png"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("../etc/passwd"));
        assert!(!is_safe_name("a/b.png"));
        assert!(!is_safe_name("a\\b.png"));
        assert!(!is_safe_name("..hidden"));
    }

    #[test]
    fn test_path_of_joins_directory() {
        let store = FileStore::new(PathBuf::from("uploads"));
        assert_eq!(store.path_of("x.png"), PathBuf::from("uploads/x.png"));
        assert_eq!(store.dir(), Path::new("uploads"));
    }
}
