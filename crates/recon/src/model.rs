use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{Channel, DateRange, Grid, LedgerRecord, Money, PaymentRecord, ReportingPeriod};
use tally_import::{ColumnMapping, SourceReport};

/// The ERP export, optionally with a caller-supplied column mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceInput {
    pub grid: Grid,
    #[serde(default)]
    pub mapping: Option<ColumnMapping>,
}

/// One payment-platform statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSourceInput {
    pub channel: Channel,
    pub grid: Grid,
    #[serde(default)]
    pub mapping: Option<ColumnMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconInput {
    pub ledger: SourceInput,
    #[serde(default)]
    pub payments: Vec<PaymentSourceInput>,
    /// Physically counted cash.
    #[serde(default)]
    pub cash_actual: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub ledger: LedgerRecord,
    pub payment: PaymentRecord,
    /// Absolute gap between the two timestamps.
    pub time_diff_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matches: Vec<MatchedPair>,
    /// Type A: booked in the ledger, never received.
    pub unmatched_ledger: Vec<LedgerRecord>,
    /// Type B: received, never booked.
    pub unmatched_payments: Vec<PaymentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_revenue_ledger: Money,
    pub total_revenue_actual: Money,
    pub total_valid_revenue: Money,
    pub channel_totals: BTreeMap<Channel, Money>,
    /// `total_revenue_actual - total_revenue_ledger`.
    pub variance: Money,
    pub cash_balance: Money,
    pub total_commission: Money,
    /// Distinct non-empty phone numbers.
    pub footfall: usize,
    /// Matched pairs over aggregated digital ledger records, in `[0, 1]`.
    pub match_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub summary: Summary,
    pub matches: Vec<MatchedPair>,
    pub missing_money: Vec<LedgerRecord>,
    pub missing_entry: Vec<PaymentRecord>,
    pub cash_records: Vec<LedgerRecord>,
    pub deposit_records: Vec<LedgerRecord>,
    pub processed_at: DateTime<Utc>,
    pub date_range: Option<DateRange>,
    pub period: ReportingPeriod,
    pub period_label: String,
    pub sources: Vec<SourceReport>,
}

impl ReconciliationResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
