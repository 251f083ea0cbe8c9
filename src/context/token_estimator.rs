//! Token estimation
//!
//! The default estimator is a deterministic character-ratio heuristic
//! (~4 characters per token) with per-kind multipliers. A tiktoken-backed
//! estimator is available behind the same trait.

use super::models::ContentKind;
use crate::error::{ContextError, Result};
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str, kind: ContentKind) -> usize;

    /// Estimate tokens for multiple texts of the same kind
    fn estimate_batch(&self, texts: &[&str], kind: ContentKind) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t, kind)).collect()
    }
}

/// Character-ratio estimator: `ceil(chars / 4)`, then `code` ×1.2 and
/// `markdown` ×1.1, both rounded up
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str, kind: ContentKind) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count();
        let base = chars.div_ceil(self.chars_per_token);
        apply_kind_multiplier(base, kind)
    }
}

/// Integer form of the kind multipliers so rounding is exact
fn apply_kind_multiplier(base: usize, kind: ContentKind) -> usize {
    match kind {
        ContentKind::Text => base,
        ContentKind::Code => (base * 12).div_ceil(10),
        ContentKind::Markdown => (base * 11).div_ceil(10),
    }
}

/// Tiktoken-based estimator using cl100k_base. Ignores the content kind.
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| ContextError::Estimator(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str, _kind: ContentKind) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }
}
