//! One-file-per-message document store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, RenderedDocument, Result};

/// Directory of `{id}.md` documents.
///
/// Every write replaces the whole file through a temporary sibling and a
/// rename, so a document is either the old version or the new one.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::io(format!("Failed to create output directory {}", dir.display()), e)
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Writes a document, overwriting any previous export of the same message.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn write(&self, document: &RenderedDocument) -> Result<PathBuf> {
        let path = self.dir.join(document.file_name());
        write_atomic(&path, document.content.as_bytes())?;

        tracing::trace!(path = %path.display(), "Wrote document");

        Ok(path)
    }
}

/// Write `contents` to `path` via a temporary file in the same directory.
///
/// # Errors
/// Returns error if either the write or the rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)
        .map_err(|e| AppError::io(format!("Failed to write {}", tmp.display()), e))?;

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::io(format!("Failed to replace {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(id: i64, content: &str) -> RenderedDocument {
        RenderedDocument {
            message_id: id,
            content: content.into(),
        }
    }

    #[test]
    fn test_write_creates_id_named_file() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(&dir.path().join("out")).unwrap();

        let path = store.write(&doc(42, "hello\n")).unwrap();

        assert_eq!(path, dir.path().join("out/42.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn test_rewrite_overwrites_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();

        store.write(&doc(1, "first version, longer")).unwrap();
        store.write(&doc(1, "second")).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("1.md")).unwrap(), "second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_unwritable_destination_is_an_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        assert!(DocumentStore::open(&blocker.join("sub")).is_err());
    }
}
