use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyword-triggered commission on a ledger line's pre-deduction amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub name: String,
    pub keyword: String,
    pub rate: Decimal,
}

impl CommissionRule {
    pub fn new(name: &str, keyword: &str, rate: Decimal) -> Self {
        CommissionRule {
            name: name.to_string(),
            keyword: keyword.to_string(),
            rate,
        }
    }
}

/// Run-wide settings. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Max minutes between a ledger line and its payment.
    #[serde(default = "default_match_window")]
    pub match_window_minutes: u32,
    /// Max minutes between same-identity lines merged into one event.
    #[serde(default = "default_aggregation_window")]
    pub aggregation_window_minutes: u32,
    /// Evaluated in order; the first keyword hit wins.
    #[serde(default = "default_commission_rules")]
    pub commission_rules: Vec<CommissionRule>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Commission rule '{name}' has rate {rate} outside 0..=1")]
    RateOutOfRange { name: String, rate: Decimal },
}

fn default_match_window() -> u32 {
    45
}

fn default_aggregation_window() -> u32 {
    5
}

fn default_commission_rules() -> Vec<CommissionRule> {
    vec![
        CommissionRule::new("洗+谢 (Full)", "洗", Decimal::new(10, 2)),
        CommissionRule::new("谢 (Referral)", "谢", Decimal::new(15, 2)),
    ]
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            match_window_minutes: default_match_window(),
            aggregation_window_minutes: default_aggregation_window(),
            commission_rules: default_commission_rules(),
        }
    }
}

impl ReconciliationConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ReconciliationConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.commission_rules {
            if rule.rate < Decimal::ZERO || rule.rate > Decimal::ONE {
                return Err(ConfigError::RateOutOfRange {
                    name: rule.name.clone(),
                    rate: rule.rate,
                });
            }
        }
        Ok(())
    }

    pub fn match_window(&self) -> Duration {
        Duration::minutes(i64::from(self.match_window_minutes))
    }

    pub fn aggregation_window(&self) -> Duration {
        Duration::minutes(i64::from(self.aggregation_window_minutes))
    }
}
