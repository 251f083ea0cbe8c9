//! Token budget management
//!
//! A request gets one global budget (default 8,000 tokens) and exactly one
//! tier ceiling:
//! - Discovery: 500 tokens
//! - Activation: 2,000 tokens
//! - Execution: 4,000 tokens
//! - Review: 3,000 tokens
//!
//! The two limits are independent. Loads are never rejected; usage past
//! the global budget is tracked and reported as overage.

use super::models::{Tier, UsageStats};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-tier token ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierLimits {
    pub discovery: usize,
    pub activation: usize,
    pub execution: usize,
    pub review: usize,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            discovery: 500,
            activation: 2000,
            execution: 4000,
            review: 3000,
        }
    }
}

impl TierLimits {
    pub fn limit(&self, tier: Tier) -> usize {
        match tier {
            Tier::Discovery => self.discovery,
            Tier::Activation => self.activation,
            Tier::Execution => self.execution,
            Tier::Review => self.review,
        }
    }
}

/// Token budget configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBudgetConfig {
    pub total: usize,
    pub tiers: TierLimits,
}

impl Default for TokenBudgetConfig {
    fn default() -> Self {
        Self {
            total: 8000,
            tiers: TierLimits::default(),
        }
    }
}

impl TokenBudgetConfig {
    /// Validate that the budget configuration is consistent
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.total == 0 {
            return Err(BudgetError::ZeroBudget);
        }

        for tier in Tier::ALL {
            let limit = self.tiers.limit(tier);
            if limit > self.total {
                return Err(BudgetError::TierExceedsTotal {
                    tier,
                    limit,
                    total: self.total,
                });
            }
        }

        Ok(())
    }
}

/// Token budget errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("Configuration invalid: total token budget must be positive")]
    ZeroBudget,

    #[error("Configuration invalid: {tier} ceiling of {limit} tokens exceeds total budget of {total}")]
    TierExceedsTotal { tier: Tier, limit: usize, total: usize },
}

/// Explicit budget accounting for one manager instance
///
/// `current_usage` only grows through [`BudgetState::charge`] and only
/// shrinks through [`BudgetState::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetState {
    token_budget: usize,
    tier_limits: TierLimits,
    current_usage: usize,
}

impl BudgetState {
    pub fn new(config: &TokenBudgetConfig) -> Self {
        Self {
            token_budget: config.total,
            tier_limits: config.tiers,
            current_usage: 0,
        }
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    pub fn tier_limits(&self) -> &TierLimits {
        &self.tier_limits
    }

    pub fn tier_limit(&self, tier: Tier) -> usize {
        self.tier_limits.limit(tier)
    }

    pub fn current_usage(&self) -> usize {
        self.current_usage
    }

    /// Record tokens kept by a load
    pub fn charge(&mut self, tokens: usize) {
        self.current_usage = self.current_usage.saturating_add(tokens);
    }

    pub fn reset(&mut self) {
        self.current_usage = 0;
    }

    /// Remaining global budget, never negative
    pub fn remaining(&self) -> usize {
        self.token_budget.saturating_sub(self.current_usage)
    }

    pub fn is_over_budget(&self) -> bool {
        self.current_usage > self.token_budget
    }

    pub fn usage_stats(&self) -> UsageStats {
        let utilization = if self.token_budget == 0 {
            0.0
        } else {
            100.0 * self.current_usage as f64 / self.token_budget as f64
        };

        UsageStats {
            used: self.current_usage,
            budget: self.token_budget,
            remaining: self.remaining(),
            utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TokenBudgetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total, 8000);
        assert_eq!(config.tiers.limit(Tier::Discovery), 500);
        assert_eq!(config.tiers.limit(Tier::Activation), 2000);
        assert_eq!(config.tiers.limit(Tier::Execution), 4000);
        assert_eq!(config.tiers.limit(Tier::Review), 3000);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = TokenBudgetConfig {
            total: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(BudgetError::ZeroBudget));
    }

    #[test]
    fn test_tier_above_total_rejected() {
        let config = TokenBudgetConfig {
            total: 3500,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BudgetError::TierExceedsTotal { tier: Tier::Execution, .. })
        ));
    }

    #[test]
    fn test_charge_and_reset() {
        let mut state = BudgetState::new(&TokenBudgetConfig::default());
        state.charge(1000);
        state.charge(500);
        assert_eq!(state.current_usage(), 1500);
        assert_eq!(state.remaining(), 6500);

        state.reset();
        assert_eq!(state.current_usage(), 0);
        assert_eq!(state.remaining(), 8000);
    }

    #[test]
    fn test_overage_is_tracked_not_rejected() {
        let mut state = BudgetState::new(&TokenBudgetConfig::default());
        state.charge(9000);

        let stats = state.usage_stats();
        assert!(state.is_over_budget());
        assert_eq!(stats.used, 9000);
        assert_eq!(stats.remaining, 0);
        assert!(stats.used + stats.remaining >= stats.budget);
        assert!((stats.utilization - 112.5).abs() < 1e-9);
    }

    #[test]
    fn test_stats_invariant_within_budget() {
        let mut state = BudgetState::new(&TokenBudgetConfig::default());
        state.charge(2000);
        let stats = state.usage_stats();
        assert_eq!(stats.used + stats.remaining, stats.budget);
        assert!((stats.utilization - 25.0).abs() < 1e-9);
    }
}
