//! Context optimizer
//!
//! Budgeted context selection for AI agents: token estimation, relevance
//! scoring, pruning and tiered loading of memory, skill, workflow and
//! recent-file content.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod store;

pub use config::Config;
pub use context::{ContextOptimizationEngine, OptimizationResult};
pub use error::{ContextError, Result};
