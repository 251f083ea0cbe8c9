//! Filesystem-backed content store

use super::{ContentStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads UTF-8 files, resolving relative paths against a root directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ContentStore for FsContentStore {
    fn read(&self, path: &Path) -> Result<String, StoreError> {
        let full = self.resolve(path);
        let bytes = std::fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(full.clone()),
            _ => StoreError::Io {
                path: full.clone(),
                source: e,
            },
        })?;

        String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8(full))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("memory")).unwrap();
        std::fs::write(dir.path().join("memory/lessons.md"), "- lesson").unwrap();

        let store = FsContentStore::new(dir.path());
        assert_eq!(store.read(Path::new("memory/lessons.md")).unwrap(), "- lesson");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        assert!(matches!(
            store.read(Path::new("nope.md")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.md"), [0xff, 0xfe, 0xfd]).unwrap();
        let store = FsContentStore::new(dir.path());
        assert!(matches!(
            store.read(Path::new("bin.md")),
            Err(StoreError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("skills")).unwrap();
        let store = FsContentStore::new(dir.path());
        assert!(store.read(Path::new("skills")).is_err());
    }
}
