use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::Channel;

/// Which export a grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Ledger,
    Payment(Channel),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Ledger => write!(f, "ledger"),
            Source::Payment(channel) => write!(f, "{}", channel.code()),
        }
    }
}

/// Why a data row did not become a record. Dropped rows are noise, not anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    InvalidDate,
    /// Zero net, zero deposit and not cash.
    NoFinancialSubstance,
    NotMerchantCollection(String),
    BlacklistedType(String),
    BlacklistedStatus(String),
    BlacklistedCounterparty(String),
    NonRefundExpenditure,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::InvalidDate => write!(f, "invalid date"),
            DropReason::NoFinancialSubstance => write!(f, "zero value"),
            DropReason::NotMerchantCollection(kind) => {
                write!(f, "not a merchant collection: {kind}")
            }
            DropReason::BlacklistedType(kind) => write!(f, "blacklisted type: {kind}"),
            DropReason::BlacklistedStatus(status) => write!(f, "blacklisted status: {status}"),
            DropReason::BlacklistedCounterparty(cp) => {
                write!(f, "blacklisted counterparty: {cp}")
            }
            DropReason::NonRefundExpenditure => write!(f, "expenditure (non-refund)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Absolute row index in the source grid.
    pub row: usize,
    pub reason: DropReason,
}

/// Processing summary for one source grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: Source,
    /// `None` when the source was skipped because no header was found.
    pub header_row: Option<usize>,
    pub total_rows: usize,
    pub kept: usize,
    pub dropped: Vec<DroppedRow>,
}

impl SourceReport {
    pub fn skipped(source: Source) -> Self {
        SourceReport {
            source,
            header_row: None,
            total_rows: 0,
            kept: 0,
            dropped: Vec::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.header_row.is_none()
    }
}

/// Records produced from one grid, plus how they were produced.
#[derive(Debug, Clone)]
pub struct Processed<T> {
    pub records: Vec<T>,
    pub report: SourceReport,
}
