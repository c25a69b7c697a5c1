use chrono::{Duration, NaiveDateTime};
use tally_core::{LedgerRecord, Money, PaymentRecord};
use tracing::debug;

use crate::model::{MatchOutcome, MatchedPair};

/// Greedy nearest-in-time pairing.
///
/// Both sides are stably sorted by timestamp, then each ledger record in
/// turn claims the closest unclaimed payment of equal amount within
/// `window`. On equal distance the earlier payment in sorted order wins.
pub fn match_records(
    mut ledger: Vec<LedgerRecord>,
    mut payments: Vec<PaymentRecord>,
    window: Duration,
) -> MatchOutcome {
    ledger.sort_by_key(|r| r.timestamp);
    payments.sort_by_key(|p| p.timestamp);

    let mut consumed = vec![false; payments.len()];
    let mut matched: Vec<(LedgerRecord, usize, Duration)> = Vec::new();
    let mut unmatched_ledger = Vec::new();
    let tolerance = Money::from_cents(1);

    for record in ledger {
        // An out-of-range bound leaves that side of the window open.
        let upper = record.timestamp.checked_add_signed(window);
        let lower = record.timestamp.checked_sub_signed(window);
        let mut best: Option<(usize, Duration)> = None;
        for (idx, payment) in payments.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            if upper.is_some_and(|u| payment.timestamp > u) {
                break;
            }
            if lower.is_some_and(|l| payment.timestamp < l) {
                continue;
            }
            if (record.amount - payment.amount).abs() >= tolerance {
                continue;
            }
            let diff = distance(record.timestamp, payment.timestamp);
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((idx, diff));
            }
        }

        match best {
            Some((idx, diff)) => {
                consumed[idx] = true;
                matched.push((record, idx, diff));
            }
            None => unmatched_ledger.push(record),
        }
    }

    let mut slots: Vec<Option<PaymentRecord>> = payments.into_iter().map(Some).collect();
    let matches: Vec<MatchedPair> = matched
        .into_iter()
        .filter_map(|(ledger, idx, diff)| {
            slots[idx].take().map(|payment| MatchedPair {
                ledger,
                payment,
                time_diff_minutes: diff.num_milliseconds() as f64 / 60_000.0,
            })
        })
        .collect();
    let unmatched_payments: Vec<PaymentRecord> = slots.into_iter().flatten().collect();

    debug!(
        matched = matches.len(),
        missing_money = unmatched_ledger.len(),
        missing_entry = unmatched_payments.len(),
        "matching complete"
    );

    MatchOutcome {
        matches,
        unmatched_ledger,
        unmatched_payments,
    }
}

fn distance(a: NaiveDateTime, b: NaiveDateTime) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}
