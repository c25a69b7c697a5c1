//! Reconciliation of an ERP ledger against payment-platform statements:
//! time-window aggregation, greedy nearest-time matching and the summary
//! figures derived from both.
pub mod aggregate;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod model;

pub use aggregate::{aggregate, Aggregatable};
pub use engine::{reconcile, run, run_at};
pub use error::ReconError;
pub use matcher::match_records;
pub use metrics::{channel_totals, compute_summary, reporting_period};
pub use model::{
    MatchOutcome, MatchedPair, PaymentSourceInput, ReconInput, ReconciliationResult, SourceInput,
    Summary,
};
