use std::thread::{self, ScopedJoinHandle};

use chrono::{DateTime, Utc};
use tally_core::{
    Channel, LedgerCategory, LedgerRecord, Money, PaymentRecord, ReconciliationConfig,
};
use tally_import::{process_ledger, process_payments, ImportError, Processed, SourceReport};
use tracing::{info, instrument, warn};

use crate::aggregate::aggregate;
use crate::error::ReconError;
use crate::matcher::match_records;
use crate::metrics::{compute_summary, reporting_period};
use crate::model::{ReconInput, ReconciliationResult};

/// Runs the full pipeline over raw grids.
#[instrument(skip_all, fields(payment_sources = input.payments.len()))]
pub fn run(
    input: &ReconInput,
    config: &ReconciliationConfig,
) -> Result<ReconciliationResult, ReconError> {
    run_at(input, config, Utc::now())
}

/// [`run`] with an explicit processing timestamp.
pub fn run_at(
    input: &ReconInput,
    config: &ReconciliationConfig,
    processed_at: DateTime<Utc>,
) -> Result<ReconciliationResult, ReconError> {
    config.validate()?;

    // The ledger and each payment source are independent until matching.
    let (ledger, payments) = thread::scope(|s| {
        let ledger = s.spawn(|| {
            process_ledger(&input.ledger.grid, config, input.ledger.mapping.as_ref())
        });
        let payments: Vec<_> = input
            .payments
            .iter()
            .map(|src| {
                s.spawn(move || {
                    (
                        src.channel,
                        process_payments(&src.grid, src.channel, src.mapping.as_ref()),
                    )
                })
            })
            .collect();
        (join(ledger), payments.into_iter().map(join).collect::<Vec<_>>())
    });

    let ledger = ledger?;
    if ledger.records.is_empty() {
        return Err(ReconError::EmptyLedger);
    }

    let mut sources = vec![ledger.report];
    let mut payment_records = Vec::new();
    for (channel, processed) in payments {
        match processed {
            Ok(Processed { records, report }) => {
                payment_records.extend(records);
                sources.push(report);
            }
            Err(ImportError::HeaderNotFound { input }) => {
                warn!(%channel, "no header row found, skipping statement");
                sources.push(SourceReport::skipped(input));
            }
            Err(e) => return Err(e.into()),
        }
    }
    if payment_records.is_empty() {
        return Err(ReconError::NoPaymentRecords);
    }

    Ok(reconcile(
        ledger.records,
        payment_records,
        input.cash_actual,
        config,
        processed_at,
        sources,
    ))
}

/// Classifies, aggregates, matches and summarizes already-cleansed records.
pub fn reconcile(
    ledger: Vec<LedgerRecord>,
    payments: Vec<PaymentRecord>,
    cash_actual: Money,
    config: &ReconciliationConfig,
    processed_at: DateTime<Utc>,
    sources: Vec<SourceReport>,
) -> ReconciliationResult {
    let agg_window = config.aggregation_window();

    let mut digital = Vec::new();
    let mut cash = Vec::new();
    let mut deposits = Vec::new();
    for record in &ledger {
        match record.category() {
            LedgerCategory::Cash => cash.push(record.clone()),
            LedgerCategory::DepositOnly => deposits.push(record.clone()),
            LedgerCategory::Digital => digital.push(record.clone()),
            LedgerCategory::Other => {}
        }
    }

    let outcome = match_records(
        aggregate(&digital, agg_window),
        aggregate(&payments, agg_window),
        config.match_window(),
    );
    let summary = compute_summary(&ledger, &payments, &outcome, cash_actual);
    let (date_range, period) = reporting_period(&ledger, &payments);

    info!(
        ledger = ledger.len(),
        payments = payments.len(),
        matched = outcome.matches.len(),
        missing_money = outcome.unmatched_ledger.len(),
        missing_entry = outcome.unmatched_payments.len(),
        wechat = %summary.channel_totals.get(&Channel::WeChat).copied().unwrap_or_default(),
        alipay = %summary.channel_totals.get(&Channel::Alipay).copied().unwrap_or_default(),
        variance = %summary.variance,
        %period,
        "reconciliation complete"
    );

    ReconciliationResult {
        summary,
        matches: outcome.matches,
        missing_money: outcome.unmatched_ledger,
        missing_entry: outcome.unmatched_payments,
        cash_records: aggregate(&cash, agg_window),
        deposit_records: aggregate(&deposits, agg_window),
        processed_at,
        date_range,
        period_label: period.to_string(),
        period,
        sources,
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
