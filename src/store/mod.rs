//! Read access to memory, skill and workflow files
//!
//! Stores return `Result`; callers in the context pipeline collapse
//! failures to "no content" via [`ContentStore::read_optional`].

pub mod fs;
pub mod memory;

pub use fs::FsContentStore;
pub use memory::InMemoryContentStore;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Collaborator read errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),
}

/// Source of text content addressed by path
pub trait ContentStore: Send + Sync {
    /// Read the full text at `path`
    fn read(&self, path: &Path) -> Result<String, StoreError>;

    /// Read, treating any failure as absent content
    fn read_optional(&self, path: &Path) -> Option<String> {
        match self.read(path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Skipping unreadable source {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Read and split into list items; missing files yield no items
    fn read_items(&self, path: &Path) -> Vec<String> {
        self.read_optional(path)
            .map(|content| split_items(&content))
            .unwrap_or_default()
    }
}

static ITEM_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*]|\d+\.)\s+").expect("valid item regex"));

/// Split a markdown list into items
///
/// Each line starting with `-`, `*` or `N.` opens a new item; following
/// lines are continuations. Text before the first item is dropped.
pub fn split_items(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in content.lines() {
        if ITEM_START.is_match(line) {
            if let Some(lines) = current.take() {
                items.push(lines.join("\n").trim().to_string());
            }
            current = Some(vec![line]);
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some(lines) = current {
        items.push(lines.join("\n").trim().to_string());
    }

    items.retain(|item| !item.is_empty());
    items
}
