//! Context optimization engine
//!
//! Runs one optimization pass per request: pick a tier, load ranked
//! sources within budget, prune the memory corpus for the same intent,
//! then report usage and recommendations.

use super::adaptive_loader::{AdaptiveLoader, ScoredSourceResult};
use super::manager::{ContextManager, MemoryOptimization};
use super::models::{Recommendation, SessionContext, SessionContextUpdate, Tier, UsageStats};
use super::relevance::RelevanceScorer;
use super::token_estimator::{CharRatioEstimator, TokenEstimator};
use crate::config::Config;
use crate::error::{ContextError, Result};
use crate::metrics::{Metrics, PassObservation, METRICS};
use crate::store::{ContentStore, FsContentStore};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span};
use uuid::Uuid;

/// Thresholds that trigger recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Warn above this utilization percentage
    pub high_utilization: f64,
    /// Suggest loading more below this utilization percentage
    pub low_utilization: f64,
    /// Report memory pruning above this many removed items
    pub pruned_items_threshold: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            high_utilization: 90.0,
            low_utilization: 30.0,
            pruned_items_threshold: 10,
        }
    }
}

/// Result of one optimization pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub pass_id: Uuid,
    pub loaded_content: Vec<ScoredSourceResult>,
    pub tier: Tier,
    /// Token ceiling of the selected tier
    pub budget: usize,
    pub stats: UsageStats,
    pub memory_optimization: MemoryOptimization,
    pub recommendations: Vec<Recommendation>,
    pub session_context: SessionContext,
}

impl OptimizationResult {
    pub fn truncated_sources(&self) -> usize {
        self.loaded_content.iter().filter(|r| r.load.pruned).count()
    }
}

/// Context optimization engine
pub struct ContextOptimizationEngine {
    config: Config,
    store: Arc<dyn ContentStore>,
    estimator: Arc<dyn TokenEstimator>,
    reference_date: Option<NaiveDate>,
    manager: ContextManager,
    loader: AdaptiveLoader,
    metrics: Option<Arc<Metrics>>,
}

impl ContextOptimizationEngine {
    /// Create an engine reading collaborator files from `store`
    pub fn new(config: Config, store: Arc<dyn ContentStore>) -> Result<Self> {
        config.validate()?;
        let metrics = config.metrics.enabled.then(|| METRICS.clone());
        Ok(Self::assemble(
            config,
            store,
            Arc::new(CharRatioEstimator::default()),
            None,
            metrics,
        ))
    }

    /// Create an engine over the filesystem at `config.sources.root`
    pub fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(FsContentStore::new(config.sources.root.clone()));
        Self::new(config, store)
    }

    /// Pin "today" for freshness and decision recency
    pub fn with_reference_date(self, date: NaiveDate) -> Self {
        Self::assemble(self.config, self.store, self.estimator, Some(date), self.metrics)
    }

    pub fn with_estimator(self, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self::assemble(self.config, self.store, estimator, self.reference_date, self.metrics)
    }

    /// Record into a specific metrics collector instead of the global one
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn without_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    fn assemble(
        config: Config,
        store: Arc<dyn ContentStore>,
        estimator: Arc<dyn TokenEstimator>,
        reference_date: Option<NaiveDate>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let mut scorer = RelevanceScorer::new(config.scoring.clone());
        if let Some(date) = reference_date {
            scorer = scorer.with_reference_date(date);
        }

        let manager = ContextManager::new(
            &config.token_budget,
            config.pruning.clone(),
            scorer.clone(),
            store.clone(),
        )
        .with_estimator(estimator.clone());
        let loader = AdaptiveLoader::new(config.sources.clone(), store.clone(), scorer);

        Self {
            config,
            store,
            estimator,
            reference_date,
            manager,
            loader,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context_manager(&self) -> &ContextManager {
        &self.manager
    }

    pub fn context_manager_mut(&mut self) -> &mut ContextManager {
        &mut self.manager
    }

    pub fn loader(&self) -> &AdaptiveLoader {
        &self.loader
    }

    /// Run a full optimization pass
    ///
    /// Usage is reset first, so each pass is accounted on its own.
    pub fn optimize(
        &mut self,
        skill_name: Option<&str>,
        intent: &str,
        session: SessionContextUpdate,
    ) -> OptimizationResult {
        let pass_id = Uuid::new_v4();
        let span = info_span!("optimize_context", %pass_id, skill = skill_name.unwrap_or("-"));
        let _guard = span.enter();

        self.manager.update_session_context(session);
        self.manager.reset_usage();
        let session = self.manager.session_context().clone();

        let tier = self.loader.determine_tier(intent, &session);
        let sources = self.loader.identify_content_sources(skill_name, intent, &session);
        let source_count = sources.len();
        let ranked = self.loader.score_and_rank_content(sources, intent, &session);
        let skipped_sources = source_count - ranked.len();

        let remaining = self.manager.remaining_budget();
        let loaded_content =
            self.loader
                .load_within_budget(ranked, tier, remaining, intent, &mut self.manager);

        let sources_config = self.loader.sources();
        let memory_optimization = self.manager.optimize_memory_files(
            &sources_config.lessons,
            &sources_config.decisions,
            intent,
        );

        let stats = self.manager.usage_stats();
        let truncated = loaded_content.iter().filter(|r| r.load.pruned).count();
        let recommendations = self.recommendations(&stats, &memory_optimization, truncated);

        if let Some(metrics) = &self.metrics {
            metrics.record_pass(&PassObservation {
                tier,
                stats,
                over_budget: self.manager.budget_state().is_over_budget(),
                truncated_sources: truncated,
                skipped_sources,
                pruned_lessons: memory_optimization.stats.pruned_lessons,
                pruned_decisions: memory_optimization.stats.pruned_decisions,
            });
        }

        info!(
            "Optimized context: tier={}, sources={}, used={}/{} ({:.1}%), recommendations={}",
            tier,
            loaded_content.len(),
            stats.used,
            stats.budget,
            stats.utilization,
            recommendations.len()
        );

        OptimizationResult {
            pass_id,
            loaded_content,
            tier,
            budget: self.manager.tier_limit(tier),
            stats,
            memory_optimization,
            recommendations,
            session_context: session,
        }
    }

    fn recommendations(
        &self,
        stats: &UsageStats,
        memory: &MemoryOptimization,
        truncated_sources: usize,
    ) -> Vec<Recommendation> {
        let thresholds = &self.config.recommendations;
        let mut recommendations = Vec::new();

        if stats.utilization > thresholds.high_utilization {
            recommendations.push(Recommendation::warning(
                format!("High token usage: {:.1}% of budget", stats.utilization),
                "Narrow the query or split the task into smaller requests",
            ));
        } else if stats.utilization < thresholds.low_utilization {
            recommendations.push(Recommendation::info(
                format!("Low token usage: {:.1}% of budget", stats.utilization),
                "More context can be loaded if the answer needs it",
            ));
        }

        let pruned = memory.stats.total_pruned();
        if pruned > thresholds.pruned_items_threshold {
            recommendations.push(Recommendation::info(
                format!("Pruned {} low-relevance memory items", pruned),
                "Archive or consolidate stale lessons and decisions",
            ));
        }

        if truncated_sources > 0 {
            recommendations.push(Recommendation::warning(
                format!("{} source(s) truncated to fit the tier budget", truncated_sources),
                "Split large files or move detail into linked documents",
            ));
        }

        recommendations
    }
}

impl TryFrom<Config> for ContextOptimizationEngine {
    type Error = ContextError;

    fn try_from(config: Config) -> Result<Self> {
        Self::from_config(config)
    }
}
