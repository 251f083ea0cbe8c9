//! Context manager: budget accounting, session state, budgeted loading
//!
//! Owns the per-request [`BudgetState`] and the [`SessionContext`].
//! `load_with_budget` is the only operation that raises usage and
//! `reset_usage` the only one that lowers it.

use super::models::{ContentKind, LoadResult, SessionContext, SessionContextUpdate, Tier, UsageStats};
use super::pruner::{PrunedMemory, PruningConfig, SmartPruner};
use super::relevance::RelevanceScorer;
use super::token_budget::{BudgetState, TokenBudgetConfig};
use super::token_estimator::{CharRatioEstimator, TokenEstimator};
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Before/after counts of a memory optimization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub lessons_before: usize,
    pub lessons_after: usize,
    pub decisions_before: usize,
    pub decisions_after: usize,
    pub pruned_lessons: usize,
    pub pruned_decisions: usize,
}

impl MemoryStats {
    pub fn total_pruned(&self) -> usize {
        self.pruned_lessons + self.pruned_decisions
    }
}

/// Memory items kept for an intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOptimization {
    pub lessons: Vec<String>,
    pub decisions: Vec<String>,
    pub stats: MemoryStats,
}

/// Context manager
pub struct ContextManager {
    budget: BudgetState,
    session: SessionContext,
    estimator: Arc<dyn TokenEstimator>,
    scorer: RelevanceScorer,
    pruner: SmartPruner,
    store: Arc<dyn ContentStore>,
}

impl ContextManager {
    /// Create a manager with the character-ratio estimator
    pub fn new(
        budget: &TokenBudgetConfig,
        pruning: PruningConfig,
        scorer: RelevanceScorer,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let estimator: Arc<dyn TokenEstimator> = Arc::new(CharRatioEstimator::default());
        let pruner = SmartPruner::new(pruning, scorer.clone(), estimator.clone());

        Self {
            budget: BudgetState::new(budget),
            session: SessionContext::default(),
            estimator,
            scorer,
            pruner,
            store,
        }
    }

    /// Swap the token estimator used for accounting and pruning
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.pruner = SmartPruner::new(
            self.pruner.config().clone(),
            self.scorer.clone(),
            estimator.clone(),
        );
        self.estimator = estimator;
        self
    }

    pub fn session_context(&self) -> &SessionContext {
        &self.session
    }

    /// Shallow-merge updates into the session context
    pub fn update_session_context(&mut self, updates: SessionContextUpdate) {
        self.session.merge(updates);
        debug!(
            "Session context: phase={:?}, recent_files={}, activities={}, error={}",
            self.session.current_phase,
            self.session.recent_files.len(),
            self.session.recent_activities.len(),
            self.session.error_context.is_some()
        );
    }

    /// Load content under a tier ceiling, pruning it if necessary
    ///
    /// Never refuses: the kept tokens are always charged, even when the
    /// global budget is already exhausted.
    pub fn load_with_budget(
        &mut self,
        content: &str,
        tier: Tier,
        intent: &str,
        kind: ContentKind,
    ) -> LoadResult {
        let tokens = self.estimator.estimate(content, kind);
        let limit = self.budget.tier_limit(tier);

        let result = if tokens <= limit {
            LoadResult {
                content: content.to_string(),
                tokens,
                pruned: false,
                tier,
                original_tokens: None,
                reduction_ratio: None,
            }
        } else {
            let pruned = self.pruner.prune_content_as(content, limit, true, kind);
            let pruned_tokens = self.estimator.estimate(&pruned, kind);
            debug!(
                "Pruned content for {} tier ({:?}): {} -> {} tokens",
                tier, intent, tokens, pruned_tokens
            );

            LoadResult {
                content: pruned,
                tokens: pruned_tokens,
                pruned: true,
                tier,
                original_tokens: Some(tokens),
                reduction_ratio: Some(pruned_tokens as f64 / tokens as f64),
            }
        };

        self.budget.charge(result.tokens);
        if self.budget.is_over_budget() {
            warn!(
                "Token budget exceeded: {} used of {}",
                self.budget.current_usage(),
                self.budget.token_budget()
            );
        }

        result
    }

    pub fn remaining_budget(&self) -> usize {
        self.budget.remaining()
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.budget.usage_stats()
    }

    pub fn reset_usage(&mut self) {
        self.budget.reset();
    }

    pub fn budget_state(&self) -> &BudgetState {
        &self.budget
    }

    pub fn tier_limit(&self, tier: Tier) -> usize {
        self.budget.tier_limit(tier)
    }

    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    pub fn pruner(&self) -> &SmartPruner {
        &self.pruner
    }

    /// Read lessons and decisions and keep the items relevant to `intent`
    ///
    /// Unreadable sources count as empty collections.
    pub fn optimize_memory_files(
        &self,
        lessons_source: &Path,
        decisions_source: &Path,
        intent: &str,
    ) -> MemoryOptimization {
        let lessons = self.store.read_items(lessons_source);
        let decisions = self.store.read_items(decisions_source);

        let PrunedMemory {
            lessons: kept_lessons,
            decisions: kept_decisions,
            pruned_lessons,
            pruned_decisions,
        } = self
            .pruner
            .prune_memory_files(&lessons, &decisions, intent, &self.session);

        MemoryOptimization {
            stats: MemoryStats {
                lessons_before: lessons.len(),
                lessons_after: kept_lessons.len(),
                decisions_before: decisions.len(),
                decisions_after: kept_decisions.len(),
                pruned_lessons,
                pruned_decisions,
            },
            lessons: kept_lessons,
            decisions: kept_decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryContentStore;
    use chrono::NaiveDate;

    fn manager_with(store: InMemoryContentStore) -> ContextManager {
        let scorer = RelevanceScorer::default()
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        ContextManager::new(
            &TokenBudgetConfig::default(),
            PruningConfig::default(),
            scorer,
            Arc::new(store),
        )
    }

    fn manager() -> ContextManager {
        manager_with(InMemoryContentStore::new())
    }

    #[test]
    fn test_load_within_tier() {
        let mut m = manager();
        let result = m.load_with_budget("a".repeat(400).as_str(), Tier::Discovery, "", ContentKind::Text);
        assert!(!result.pruned);
        assert_eq!(result.tokens, 100);
        assert_eq!(m.usage_stats().used, 100);
        assert_eq!(m.remaining_budget(), 7900);
    }

    #[test]
    fn test_load_over_tier_is_pruned_and_charged() {
        let mut m = manager();
        let content = (0..200)
            .map(|i| format!("line {} of a long document body", i))
            .collect::<Vec<_>>()
            .join("\n");

        let result = m.load_with_budget(&content, Tier::Discovery, "", ContentKind::Text);
        assert!(result.pruned);
        assert!(result.tokens < result.original_tokens.unwrap());
        assert!(result.tokens <= 550);
        assert!(result.original_tokens.unwrap() > 500);
        assert!(result.reduction_ratio.unwrap() < 1.0);
        assert_eq!(m.usage_stats().used, result.tokens);
    }

    #[test]
    fn test_oversized_single_line_keeps_content() {
        let mut m = manager();
        let result = m.load_with_budget(&"word ".repeat(600), Tier::Discovery, "", ContentKind::Text);

        assert!(result.pruned);
        assert_eq!(result.original_tokens, Some(750));
        assert!(result.tokens >= 500 && result.tokens < 750);
        assert!(result.content.starts_with("word"));
        assert_eq!(m.usage_stats().used, result.tokens);
    }

    #[test]
    fn test_reset_then_load_matches_usage() {
        let mut m = manager();
        m.load_with_budget("some earlier content", Tier::Execution, "", ContentKind::Text);
        m.reset_usage();
        let result = m.load_with_budget("# Heading\nbody text", Tier::Review, "", ContentKind::Markdown);
        assert_eq!(m.usage_stats().used, result.tokens);
    }

    #[test]
    fn test_overage_never_blocks() {
        let mut m = manager();
        let big = "z".repeat(16_000); // 4000 tokens, fits execution tier
        m.load_with_budget(&big, Tier::Execution, "", ContentKind::Text);
        m.load_with_budget(&big, Tier::Execution, "", ContentKind::Text);
        let third = m.load_with_budget(&big, Tier::Execution, "", ContentKind::Text);

        assert_eq!(third.tokens, 4000);
        let stats = m.usage_stats();
        assert_eq!(stats.used, 12_000);
        assert_eq!(stats.remaining, 0);
        assert!(stats.utilization > 100.0);
        assert_eq!(m.remaining_budget(), 0);
    }

    #[test]
    fn test_update_session_context_caps() {
        let mut m = manager();
        m.update_session_context(
            SessionContextUpdate::new()
                .phase("testing")
                .recent_files((0..12).map(|i| format!("{}.rs", i))),
        );
        assert_eq!(m.session_context().recent_files.len(), 10);
        assert_eq!(m.session_context().current_phase.as_deref(), Some("testing"));
    }

    #[test]
    fn test_optimize_memory_files() {
        let store = InMemoryContentStore::new()
            .with_file(
                "memory/lessons.md",
                "# Lessons\n- Flaky test fixed by isolating the test database\n- Lunch is at noon\n",
            )
            .with_file("memory/decisions.md", "- 2025-06-10: adopt nextest\n- 2021-01-01: adopt jest\n");
        let m = manager_with(store);

        let result = m.optimize_memory_files(
            Path::new("memory/lessons.md"),
            Path::new("memory/decisions.md"),
            "fix the failing test suite",
        );

        assert_eq!(result.stats.lessons_before, 2);
        assert_eq!(result.lessons.len(), 1);
        assert!(result.lessons[0].contains("Flaky test"));
        assert_eq!(result.stats.pruned_lessons, 1);
        assert_eq!(result.decisions[0], "- 2025-06-10: adopt nextest");
        assert_eq!(result.stats.total_pruned(), 1);
    }

    #[test]
    fn test_optimize_memory_files_missing_sources() {
        let m = manager();
        let result = m.optimize_memory_files(Path::new("a.md"), Path::new("b.md"), "anything");
        assert!(result.lessons.is_empty());
        assert!(result.decisions.is_empty());
        assert_eq!(result.stats, MemoryStats::default());
    }
}
