//! Configuration for the context optimizer
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file,
//! then `CONTEXT_OPTIMIZER_*` environment variables (a `.env` file is
//! loaded if present). Nested keys use `__`, e.g.
//! `CONTEXT_OPTIMIZER_TOKEN_BUDGET__TOTAL=6000`.

use crate::error::{ContextError, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::context::adaptive_loader::SourcesConfig;
pub use crate::context::engine::RecommendationConfig;
pub use crate::context::pruner::PruningConfig;
pub use crate::context::relevance::TopicCatalog;
pub use crate::context::token_budget::{TierLimits, TokenBudgetConfig};

const ENV_PREFIX: &str = "CONTEXT_OPTIMIZER";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub token_budget: TokenBudgetConfig,
    pub sources: SourcesConfig,
    pub pruning: PruningConfig,
    pub scoring: TopicCatalog,
    pub recommendations: RecommendationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

impl Config {
    /// Load from a TOML file layered under the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Self = config::Config::builder()
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load defaults overlaid with the environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Self = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse inline TOML without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check budget consistency
    pub fn validate(&self) -> Result<()> {
        self.token_budget
            .validate()
            .map_err(|e| ContextError::Configuration(e.to_string()))?;

        if self.recommendations.low_utilization > self.recommendations.high_utilization {
            return Err(ContextError::Configuration(format!(
                "low utilization threshold {} is above high threshold {}",
                self.recommendations.low_utilization, self.recommendations.high_utilization
            )));
        }

        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
