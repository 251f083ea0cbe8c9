//! Smart context pruning
//!
//! Two pure operations:
//! - collection pruning: keep the highest-scoring lessons and the
//!   highest-scoring, most recent decisions
//! - document pruning: shrink one text to a token target, keeping
//!   headings, blank lines and marker lines when structure matters

use super::heuristics::{extract_date, recency_bonus};
use super::models::{ContentKind, SessionContext};
use super::relevance::RelevanceScorer;
use super::token_estimator::TokenEstimator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Lines containing any of these are always kept by structured pruning
pub const IMPORTANT_MARKERS: [&str; 4] = ["TODO", "FIXME", "NOTE", "WARNING"];

/// Pruning limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Lessons must score strictly above this to be kept
    pub lesson_min_score: f64,
    pub max_lessons: usize,
    pub max_decisions: usize,
    /// Appended when content is cut without structure preservation
    pub truncation_marker: String,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            lesson_min_score: 30.0,
            max_lessons: 15,
            max_decisions: 10,
            truncation_marker: "\n\n[... content truncated to fit token budget ...]".to_string(),
        }
    }
}

/// Result of collection pruning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedMemory {
    /// Kept lessons, best first
    pub lessons: Vec<String>,
    /// Kept decisions, best first
    pub decisions: Vec<String>,
    pub pruned_lessons: usize,
    pub pruned_decisions: usize,
}

/// Smart context pruner
pub struct SmartPruner {
    config: PruningConfig,
    scorer: RelevanceScorer,
    estimator: Arc<dyn TokenEstimator>,
}

impl SmartPruner {
    pub fn new(
        config: PruningConfig,
        scorer: RelevanceScorer,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        Self {
            config,
            scorer,
            estimator,
        }
    }

    pub fn config(&self) -> &PruningConfig {
        &self.config
    }

    /// Keep lessons scoring above the threshold (top N) and the top N
    /// decisions by score plus date recency bonus
    pub fn prune_memory_files(
        &self,
        lessons: &[String],
        decisions: &[String],
        intent: &str,
        session: &SessionContext,
    ) -> PrunedMemory {
        let mut scored_lessons: Vec<(f64, &String)> = lessons
            .iter()
            .map(|lesson| (self.scorer.score(lesson, intent, session), lesson))
            .filter(|(score, _)| *score > self.config.lesson_min_score)
            .collect();
        scored_lessons.sort_by(|a, b| descending(a.0, b.0));
        scored_lessons.truncate(self.config.max_lessons);

        let today = self.scorer.today();
        let mut scored_decisions: Vec<(f64, &String)> = decisions
            .iter()
            .map(|decision| {
                let score = self.scorer.score(decision, intent, session);
                let bonus = recency_bonus(extract_date(decision), today);
                (score + bonus, decision)
            })
            .collect();
        scored_decisions.sort_by(|a, b| descending(a.0, b.0));
        scored_decisions.truncate(self.config.max_decisions);

        let kept_lessons: Vec<String> = scored_lessons.into_iter().map(|(_, l)| l.clone()).collect();
        let kept_decisions: Vec<String> =
            scored_decisions.into_iter().map(|(_, d)| d.clone()).collect();

        let pruned = PrunedMemory {
            pruned_lessons: lessons.len() - kept_lessons.len(),
            pruned_decisions: decisions.len() - kept_decisions.len(),
            lessons: kept_lessons,
            decisions: kept_decisions,
        };

        debug!(
            "Pruned memory: lessons {} -> {}, decisions {} -> {}",
            lessons.len(),
            pruned.lessons.len(),
            decisions.len(),
            pruned.decisions.len()
        );

        pruned
    }

    /// Shrink plain text content to roughly `target_tokens`
    pub fn prune_content(&self, content: &str, target_tokens: usize, preserve_structure: bool) -> String {
        self.prune_content_as(content, target_tokens, preserve_structure, ContentKind::Text)
    }

    /// Shrink content of the given kind to roughly `target_tokens`
    ///
    /// Content already within the target is returned unchanged. With
    /// `preserve_structure`, important lines are always kept, so the
    /// result may exceed the target.
    pub fn prune_content_as(
        &self,
        content: &str,
        target_tokens: usize,
        preserve_structure: bool,
        kind: ContentKind,
    ) -> String {
        let current_tokens = self.estimator.estimate(content, kind);
        if current_tokens <= target_tokens {
            return content.to_string();
        }

        let reduction_ratio = target_tokens as f64 / current_tokens as f64;

        if preserve_structure {
            let pruned = prune_lines(content, reduction_ratio);
            // too few lines to sample from; cut characters instead
            if pruned.trim().is_empty() && !content.trim().is_empty() {
                return self.truncate(content, reduction_ratio);
            }
            pruned
        } else {
            self.truncate(content, reduction_ratio)
        }
    }

    fn truncate(&self, content: &str, reduction_ratio: f64) -> String {
        let char_count = content.chars().count();
        let keep = (char_count as f64 * reduction_ratio).ceil() as usize;
        let mut truncated: String = content.chars().take(keep).collect();
        truncated.push_str(&self.config.truncation_marker);
        truncated
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Markdown heading, blank, or marker line
pub fn is_structural_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || is_markdown_heading(trimmed)
        || IMPORTANT_MARKERS.iter().any(|m| line.contains(m))
}

/// One to six `#` followed by a space; rules out `#[attr]`, `#include`, `#!`
fn is_markdown_heading(trimmed: &str) -> bool {
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ')
}

fn prune_lines(content: &str, reduction_ratio: f64) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let target_line_count = (lines.len() as f64 * reduction_ratio).floor() as usize;

    let (important, other): (Vec<usize>, Vec<usize>) =
        (0..lines.len()).partition(|&i| is_structural_line(lines[i]));

    let slots = target_line_count.saturating_sub(important.len());
    let sampled = stride_sample(&other, slots);

    let mut keep = important;
    keep.extend(sampled);
    keep.sort_unstable();

    keep.into_iter()
        .map(|i| lines[i])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Evenly spaced picks of `count` items, starting with the first
fn stride_sample(items: &[usize], count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    if count >= items.len() {
        return items.to_vec();
    }

    let step = items.len() as f64 / count as f64;
    (0..count)
        .map(|n| items[((n as f64 * step).floor() as usize).min(items.len() - 1)])
        .collect()
}
