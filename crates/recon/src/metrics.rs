use std::collections::{BTreeMap, HashSet};

use tally_core::{Channel, DateRange, LedgerRecord, Money, PaymentRecord, ReportingPeriod};

use crate::model::{MatchOutcome, Summary};

/// Headline figures for one run.
///
/// `ledger` and `payments` are the cleansed, pre-aggregation records;
/// `outcome` carries the aggregated digital records after matching.
pub fn compute_summary(
    ledger: &[LedgerRecord],
    payments: &[PaymentRecord],
    outcome: &MatchOutcome,
    cash_actual: Money,
) -> Summary {
    let total_revenue_ledger: Money = ledger.iter().map(|r| r.amount).sum();
    let total_valid_revenue: Money = ledger.iter().map(|r| r.sales_amount).sum();
    let total_commission: Money = ledger.iter().map(|r| r.commission).sum();
    let cash_recorded: Money = ledger.iter().filter(|r| r.is_cash).map(|r| r.amount).sum();

    let digital_actual: Money = outcome
        .matches
        .iter()
        .map(|m| m.payment.amount)
        .chain(outcome.unmatched_payments.iter().map(|p| p.amount))
        .sum();
    let total_revenue_actual = digital_actual + cash_actual;

    let footfall = ledger
        .iter()
        .map(|r| r.phone.trim())
        .filter(|p| !p.is_empty())
        .collect::<HashSet<_>>()
        .len();

    let aggregated_ledger = outcome.matches.len() + outcome.unmatched_ledger.len();
    let match_rate = if aggregated_ledger == 0 {
        0.0
    } else {
        outcome.matches.len() as f64 / aggregated_ledger as f64
    };

    Summary {
        total_revenue_ledger,
        total_revenue_actual,
        total_valid_revenue,
        channel_totals: channel_totals(payments),
        variance: total_revenue_actual - total_revenue_ledger,
        cash_balance: cash_actual - cash_recorded,
        total_commission,
        footfall,
        match_rate,
    }
}

/// Net amount per channel. Every known channel is present, zero if unseen.
pub fn channel_totals(payments: &[PaymentRecord]) -> BTreeMap<Channel, Money> {
    let mut totals: BTreeMap<Channel, Money> =
        Channel::ALL.iter().map(|c| (*c, Money::ZERO)).collect();
    for p in payments {
        *totals.entry(p.channel).or_default() += p.amount;
    }
    totals
}

/// Range over every cleansed ledger and payment timestamp, and its label.
pub fn reporting_period(
    ledger: &[LedgerRecord],
    payments: &[PaymentRecord],
) -> (Option<DateRange>, ReportingPeriod) {
    let range = DateRange::spanning(
        ledger
            .iter()
            .map(|r| r.timestamp)
            .chain(payments.iter().map(|p| p.timestamp)),
    );
    (range, ReportingPeriod::infer(range))
}
