//! Context optimization with token budget enforcement
//!
//! Decides which memory notes, decisions, skill instructions and recent
//! files to hand to a downstream consumer for one request, within a global
//! token budget (8k by default) and a per-request tier ceiling.

pub mod adaptive_loader;
pub mod engine;
pub mod heuristics;
pub mod manager;
pub mod models;
pub mod pruner;
pub mod relevance;
pub mod token_budget;
pub mod token_estimator;

pub use adaptive_loader::{AdaptiveLoader, RankedSource, ScoredSourceResult, SourcesConfig};
pub use engine::{ContextOptimizationEngine, OptimizationResult, RecommendationConfig};
pub use manager::{ContextManager, MemoryOptimization, MemoryStats};
pub use models::{
    ContentKind, ContentSource, LoadResult, MemoryKind, Priority, Recommendation,
    RecommendationKind, RelevanceScore, ScoredItem, SessionContext, SessionContextUpdate,
    SourceKind, Tier, UsageStats,
};
pub use pruner::{PrunedMemory, PruningConfig, SmartPruner};
pub use relevance::{RelevanceScorer, TopicCatalog};
pub use token_budget::{BudgetError, BudgetState, TierLimits, TokenBudgetConfig};
pub use token_estimator::{CharRatioEstimator, TiktokenEstimator, TokenEstimator};
