//! Relevance scoring of candidate context against a user intent
//!
//! The score is the capped sum of five bounded components:
//! intent match (50), recency (30), phase relevance (40), freshness (20)
//! and cross-reference density (10). Total is clamped to 100.

use super::heuristics::{
    count_file_references, count_markdown_links, count_occurrences, extract_location_path,
    freshness_score,
};
use super::models::{ContentKind, RelevanceScore, ScoredItem, SessionContext};
use super::token_estimator::TokenEstimator;
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const INTENT_MATCH_CAP: f64 = 50.0;
const INTENT_MATCH_PER_HIT: f64 = 10.0;
const RECENCY_MAX: f64 = 30.0;
const RECENCY_STEP: f64 = 5.0;
const PHASE_CAP: f64 = 40.0;
const PHASE_PER_HIT: f64 = 8.0;
const REFERENCE_CAP: f64 = 10.0;
const REFERENCE_PER_HIT: f64 = 2.0;

/// Topic categories with their keywords, and which categories matter in
/// each workflow phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicCatalog {
    /// Category name -> lowercase keywords
    pub categories: IndexMap<String, Vec<String>>,
    /// Lowercase phase label -> relevant category names
    pub phases: IndexMap<String, Vec<String>>,
}

fn entries(pairs: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(key, values)| {
            (
                key.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for TopicCatalog {
    fn default() -> Self {
        let categories = entries(&[
            ("planning", &["plan", "design", "architecture", "strategy", "roadmap", "requirement"]),
            ("implementation", &["implement", "build", "create", "develop", "code", "feature"]),
            ("testing", &["test", "coverage", "assert", "mock", "fixture", "tdd"]),
            ("documentation", &["document", "readme", "docs", "comment", "guide", "explain"]),
            ("debugging", &["debug", "error", "bug", "fix", "issue", "fail", "crash"]),
            ("security", &["security", "auth", "vulnerab", "encrypt", "permission", "secret"]),
            ("performance", &["performance", "optimi", "speed", "cache", "latency", "memory"]),
        ]);

        let phases = entries(&[
            ("planning", &["planning", "documentation"]),
            ("design", &["planning", "documentation"]),
            ("implementation", &["implementation", "testing"]),
            ("development", &["implementation", "testing"]),
            ("testing", &["testing", "debugging"]),
            ("review", &["testing", "security", "performance"]),
            ("debugging", &["debugging", "testing"]),
            ("documentation", &["documentation"]),
            ("deployment", &["security", "performance"]),
        ]);

        Self { categories, phases }
    }
}

impl TopicCatalog {
    /// Categories relevant to a phase label, if the phase is known
    pub fn categories_for_phase(&self, phase: &str) -> Option<&[String]> {
        self.phases
            .get(&phase.trim().to_lowercase())
            .map(|c| c.as_slice())
    }

    fn keyword_count(&self, category: &str, text_lower: &str) -> usize {
        self.categories
            .get(category)
            .map(|keywords| {
                keywords
                    .iter()
                    .map(|kw| count_occurrences(text_lower, kw))
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Relevance scorer
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    topics: TopicCatalog,
    reference_date: Option<NaiveDate>,
}

impl RelevanceScorer {
    pub fn new(topics: TopicCatalog) -> Self {
        Self {
            topics,
            reference_date: None,
        }
    }

    /// Pin "today" for freshness checks
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn topics(&self) -> &TopicCatalog {
        &self.topics
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Total relevance score in [0, 100]
    pub fn score(&self, content: &str, intent: &str, session: &SessionContext) -> f64 {
        self.score_breakdown(content, intent, session).total
    }

    /// Score a candidate and attach its token estimate
    pub fn score_item(
        &self,
        content: &str,
        intent: &str,
        session: &SessionContext,
        estimator: &dyn TokenEstimator,
        kind: ContentKind,
    ) -> ScoredItem {
        ScoredItem {
            content: content.to_string(),
            score: self.score(content, intent, session),
            tokens: estimator.estimate(content, kind),
        }
    }

    /// Component-wise relevance score
    pub fn score_breakdown(
        &self,
        content: &str,
        intent: &str,
        session: &SessionContext,
    ) -> RelevanceScore {
        let content_lower = content.to_lowercase();
        let intent_lower = intent.to_lowercase();

        RelevanceScore::new(
            self.intent_match(&content_lower, &intent_lower),
            self.recency_boost(content, session),
            self.phase_relevance(&content_lower, session),
            freshness_score(content, self.today()),
            reference_density(content),
        )
    }

    fn intent_match(&self, content_lower: &str, intent_lower: &str) -> f64 {
        if intent_lower.trim().is_empty() {
            return 0.0;
        }

        let total: f64 = self
            .topics
            .categories
            .keys()
            .map(|category| {
                let in_intent = self.topics.keyword_count(category, intent_lower);
                let in_content = self.topics.keyword_count(category, content_lower);
                if in_intent > 0 && in_content > 0 {
                    ((in_intent * in_content) as f64 * INTENT_MATCH_PER_HIT).min(INTENT_MATCH_CAP)
                } else {
                    0.0
                }
            })
            .sum();

        total.min(INTENT_MATCH_CAP)
    }

    fn recency_boost(&self, content: &str, session: &SessionContext) -> f64 {
        if session.recent_files.is_empty() {
            return 0.0;
        }

        extract_location_path(content)
            .and_then(|path| session.recent_file_index(path))
            .map(|index| (RECENCY_MAX - RECENCY_STEP * index as f64).max(0.0))
            .unwrap_or(0.0)
    }

    fn phase_relevance(&self, content_lower: &str, session: &SessionContext) -> f64 {
        let Some(categories) = session
            .current_phase
            .as_deref()
            .and_then(|phase| self.topics.categories_for_phase(phase))
        else {
            return 0.0;
        };

        let hits: usize = categories
            .iter()
            .map(|category| self.topics.keyword_count(category, content_lower))
            .sum();

        (hits as f64 * PHASE_PER_HIT).min(PHASE_CAP)
    }
}

fn reference_density(content: &str) -> f64 {
    let references = count_markdown_links(content) + count_file_references(content);
    (references as f64 * REFERENCE_PER_HIT).min(REFERENCE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::SessionContextUpdate;
    use crate::context::token_estimator::CharRatioEstimator;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::default().with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
    }

    fn session(update: SessionContextUpdate) -> SessionContext {
        let mut ctx = SessionContext::default();
        ctx.merge(update);
        ctx
    }

    #[test]
    fn test_intent_match_counts_products() {
        let s = scorer();
        let empty = SessionContext::default();
        // testing: intent 1 x content 2 -> 20
        let score = s.score_breakdown("write a test, then another test", "add a test", &empty);
        assert_eq!(score.intent_match, 20.0);
    }

    #[test]
    fn test_intent_match_is_capped() {
        let s = scorer();
        let content = "test test test bug bug bug design design design build build build";
        let intent = "test bug design build";
        let score = s.score_breakdown(content, intent, &SessionContext::default());
        assert_eq!(score.intent_match, 50.0);
    }

    #[test]
    fn test_empty_intent_scores_no_match() {
        let s = scorer();
        let score = s.score_breakdown("test bug design", "", &SessionContext::default());
        assert_eq!(score.intent_match, 0.0);
    }

    #[test]
    fn test_recency_boost_by_position() {
        let s = scorer();
        let ctx = session(SessionContextUpdate::new().recent_files(["a.rs", "b.rs", "c.rs"]));

        let first = s.score_breakdown("Location: a.rs", "", &ctx);
        let third = s.score_breakdown("Location: c.rs", "", &ctx);
        let absent = s.score_breakdown("Location: z.rs", "", &ctx);

        assert_eq!(first.recency, 30.0);
        assert_eq!(third.recency, 20.0);
        assert_eq!(absent.recency, 0.0);
    }

    #[test]
    fn test_phase_relevance() {
        let s = scorer();
        let ctx = session(SessionContextUpdate::new().phase("Testing"));
        // testing + debugging keywords: test, mock, bug -> 3 hits
        let score = s.score_breakdown("a test with a mock for the bug", "", &ctx);
        assert_eq!(score.phase, 24.0);

        let unknown = session(SessionContextUpdate::new().phase("lunch"));
        assert_eq!(s.score_breakdown("test test", "", &unknown).phase, 0.0);
    }

    #[test]
    fn test_phase_relevance_capped() {
        let s = scorer();
        let ctx = session(SessionContextUpdate::new().phase("testing"));
        let content = "test ".repeat(20);
        assert_eq!(s.score_breakdown(&content, "", &ctx).phase, 40.0);
    }

    #[test]
    fn test_reference_density_capped() {
        let s = scorer();
        let content = "[a](a.md) [b](b.md) `x.rs` `y.rs` `z.rs` `w.rs`";
        let score = s.score_breakdown(content, "", &SessionContext::default());
        assert_eq!(score.reference_density, 10.0);
    }

    #[test]
    fn test_total_is_clamped() {
        let s = scorer();
        let ctx = session(
            SessionContextUpdate::new()
                .phase("testing")
                .recent_files(["src/lib.rs"]),
        );
        let content = format!(
            "Location: src/lib.rs 2025-06-01 {} [a](a.md) [b](b.md) [c](c.md) [d](d.md) [e](e.md)",
            "test bug ".repeat(10)
        );
        let score = s.score_breakdown(&content, "test bug", &ctx);
        assert_eq!(score.total, 100.0);
        assert!(score.intent_match + score.recency + score.phase > 100.0);
    }

    #[test]
    fn test_score_item_attaches_tokens() {
        let s = scorer();
        let item = s.score_item(
            "test",
            "test",
            &SessionContext::default(),
            &CharRatioEstimator::default(),
            ContentKind::Text,
        );
        assert_eq!(item.tokens, 1);
        assert_eq!(item.score, 10.0);
    }
}
