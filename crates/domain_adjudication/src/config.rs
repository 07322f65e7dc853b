//! Pipeline configuration
//!
//! Every threshold the deterministic rules use lives here and is passed into
//! the stages at construction.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::RetryPolicy;

/// Claimed-amount boundaries between FNOL severity tiers (USD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    /// Lowest amount rated moderate
    pub moderate: Decimal,
    /// Lowest amount rated high
    pub high: Decimal,
    /// Lowest amount rated a total loss
    pub total_loss: Decimal,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            moderate: dec!(2000),
            high: dec!(10000),
            total_loss: dec!(25000),
        }
    }
}

/// Configuration shared by the claim pipeline and its stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraud scores strictly above this require review and cap at partial
    pub fraud_review_threshold: Decimal,
    pub severity: SeverityThresholds,
    /// Reporting lag beyond this many days raises `late-reporting`
    pub late_reporting_days: i64,
    /// Claims above this amount raise `high-value-claim` (USD)
    pub high_value_threshold: Decimal,
    /// Losses within this many days of inception raise `early-policy-loss`
    pub early_policy_days: i64,
    /// Narratives with fewer words raise `sparse-narrative`
    pub min_narrative_words: usize,
    /// Upper bound on coverage retrieval queries per claim
    pub max_policy_queries: usize,
    /// Snippets requested per coverage query
    pub retrieval_top_k: usize,
    /// Token budget for each reasoning request
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fraud_review_threshold: dec!(0.5),
            severity: SeverityThresholds::default(),
            late_reporting_days: 30,
            high_value_threshold: dec!(20000),
            early_policy_days: 30,
            min_narrative_words: 6,
            max_policy_queries: 5,
            retrieval_top_k: 3,
            max_tokens: 800,
            temperature: 0.1,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fraud_review_threshold(mut self, threshold: Decimal) -> Self {
        self.fraud_review_threshold = threshold;
        self
    }
}
