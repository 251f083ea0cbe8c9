//! In-memory content store

use super::{ContentStore, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Path-keyed map of documents
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentStore {
    files: HashMap<PathBuf, String>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentStore for InMemoryContentStore {
    fn read(&self, path: &Path) -> Result<String, StoreError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }
}
