use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use tally_core::{LedgerRecord, PaymentRecord};
use tracing::debug;

/// A record that can be folded together with same-identity neighbours.
pub trait Aggregatable: Clone {
    /// Grouping key. `None` means the record always stands alone.
    fn identity(&self) -> Option<&str>;
    fn timestamp(&self) -> NaiveDateTime;
    /// Folds `next` into `self`, keeping `self`'s (earlier) timestamp.
    fn merge(self, next: &Self) -> Self;
}

impl Aggregatable for LedgerRecord {
    fn identity(&self) -> Option<&str> {
        let client = self.client.trim();
        (!client.is_empty() && client != "Unknown").then_some(client)
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn merge(self, next: &Self) -> Self {
        let kind = if self.kind.contains(next.kind.as_str()) {
            self.kind
        } else {
            format!("{} & {}", self.kind, next.kind)
        };
        let remark = if next.remark.is_empty() || self.remark.contains(next.remark.as_str()) {
            self.remark
        } else {
            format!("{} | {}", self.remark, next.remark)
        };
        LedgerRecord {
            id: format!("{}, {}", self.id, next.id),
            amount: self.amount + next.amount,
            deposit: self.deposit + next.deposit,
            sales_amount: self.sales_amount + next.sales_amount,
            commission: self.commission + next.commission,
            kind,
            remark,
            ..self
        }
    }
}

impl Aggregatable for PaymentRecord {
    fn identity(&self) -> Option<&str> {
        let cp = self.counterparty.trim();
        (!cp.is_empty()).then_some(cp)
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn merge(self, next: &Self) -> Self {
        PaymentRecord {
            id: format!("{}, {}", self.id, next.id),
            amount: self.amount + next.amount,
            ..self
        }
    }
}

/// Merges same-identity records that fall within `window` of their batch's
/// first (earliest) record.
///
/// Output order: identity-less records in input order, then each identity's
/// batches in order of the identity's first appearance.
pub fn aggregate<T: Aggregatable>(records: &[T], window: Duration) -> Vec<T> {
    let mut out = Vec::with_capacity(records.len());
    let mut groups: Vec<Vec<&T>> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match record.identity() {
            None => out.push(record.clone()),
            Some(key) => {
                let idx = *group_index.entry(key).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[idx].push(record);
            }
        }
    }

    for mut group in groups {
        group.sort_by_key(|r| r.timestamp());
        out.extend(merge_group(group, window));
    }

    debug!(input = records.len(), output = out.len(), "aggregated");
    out
}

fn merge_group<T: Aggregatable>(group: Vec<&T>, window: Duration) -> Vec<T> {
    let mut iter = group.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let (mut batches, last) = iter.fold(
        (Vec::new(), first.clone()),
        |(mut closed, current), next| {
            if next.timestamp() - current.timestamp() <= window {
                (closed, current.merge(next))
            } else {
                closed.push(current);
                (closed, next.clone())
            }
        },
    );
    batches.push(last);
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{Cell, Channel, Direction, Money};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn ledger(id: &str, client: &str, ts: NaiveDateTime, cents: i64) -> LedgerRecord {
        LedgerRecord {
            id: id.into(),
            timestamp: ts,
            amount: Money::from_cents(cents),
            deposit: Money::ZERO,
            sales_amount: Money::from_cents(cents),
            kind: "服务".into(),
            client: client.into(),
            remark: String::new(),
            phone: String::new(),
            is_cash: false,
            commission: Money::ZERO,
        }
    }

    fn payment(id: &str, counterparty: &str, ts: NaiveDateTime, cents: i64) -> PaymentRecord {
        PaymentRecord {
            id: id.into(),
            timestamp: ts,
            amount: Money::from_cents(cents),
            kind: "经营收款".into(),
            direction: Direction::Income,
            counterparty: counterparty.into(),
            channel: Channel::WeChat,
            source_row: 0,
            raw_row: vec![Cell::Empty],
            origin_id: None,
        }
    }

    #[test]
    fn same_client_within_window_merges_to_earliest() {
        let records = vec![
            ledger("2", "张三", at(10, 3, 0), 3_000),
            ledger("1", "张三", at(10, 0, 0), 5_000),
        ];
        let out = aggregate(&records, Duration::minutes(5));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, Money::from_cents(8_000));
        assert_eq!(out[0].timestamp, at(10, 0, 0));
        assert_eq!(out[0].id, "1, 2");
    }

    #[test]
    fn window_is_measured_from_batch_start() {
        // t, t+w/2, t+w merge; t+3w starts a new batch.
        let records = vec![
            ledger("a", "张三", at(10, 0, 0), 100),
            ledger("b", "张三", at(10, 2, 30), 100),
            ledger("c", "张三", at(10, 5, 0), 100),
            ledger("d", "张三", at(10, 15, 0), 100),
        ];
        let out = aggregate(&records, Duration::minutes(5));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a, b, c");
        assert_eq!(out[0].amount, Money::from_cents(300));
        assert_eq!(out[1].id, "d");
    }

    #[test]
    fn chain_does_not_extend_past_batch_start() {
        let records = vec![
            ledger("a", "张三", at(10, 0, 0), 100),
            ledger("b", "张三", at(10, 4, 0), 100),
            ledger("c", "张三", at(10, 8, 0), 100),
        ];
        let out = aggregate(&records, Duration::minutes(5));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a, b");
        assert_eq!(out[1].id, "c");
    }

    #[test]
    fn unknown_and_blank_clients_stand_alone() {
        let records = vec![
            ledger("1", "Unknown", at(10, 0, 0), 100),
            ledger("2", "Unknown", at(10, 1, 0), 100),
            ledger("3", "  ", at(10, 1, 0), 100),
        ];
        assert_eq!(aggregate(&records, Duration::minutes(5)).len(), 3);
    }

    #[test]
    fn different_clients_do_not_merge() {
        let records = vec![
            ledger("1", "张三", at(10, 0, 0), 100),
            ledger("2", "李四", at(10, 1, 0), 100),
        ];
        assert_eq!(aggregate(&records, Duration::minutes(5)).len(), 2);
    }

    #[test]
    fn ledger_merge_joins_types_and_remarks() {
        let mut sale = ledger("1", "张三", at(10, 0, 0), 5_000);
        sale.remark = "洗吹".into();
        sale.commission = Money::from_cents(500);
        let mut topup = ledger("2", "张三", at(10, 1, 0), 20_000);
        topup.kind = "押金充值".into();
        topup.sales_amount = Money::ZERO;
        topup.remark = "洗吹".into();
        let mut third = ledger("3", "张三", at(10, 2, 0), 100);
        third.remark = "加急".into();

        let out = aggregate(&[sale, topup, third], Duration::minutes(5));
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert_eq!(merged.kind, "服务 & 押金充值");
        assert_eq!(merged.remark, "洗吹 | 加急");
        assert_eq!(merged.commission, Money::from_cents(500));
        assert_eq!(merged.sales_amount, Money::from_cents(5_100));
        assert_eq!(merged.amount, Money::from_cents(25_100));
    }

    #[test]
    fn output_order_is_standalone_then_first_appearance() {
        let records = vec![
            ledger("b1", "李四", at(9, 0, 0), 100),
            ledger("u1", "", at(11, 0, 0), 100),
            ledger("a1", "张三", at(8, 0, 0), 100),
            ledger("b2", "李四", at(12, 0, 0), 100),
        ];
        let ids: Vec<String> = aggregate(&records, Duration::minutes(5))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["u1", "b1", "b2", "a1"]);
    }

    #[test]
    fn payments_merge_by_counterparty() {
        let records = vec![
            payment("p1", "张三", at(10, 0, 0), 5_000),
            payment("p2", "张三", at(10, 4, 0), 3_000),
            payment("p3", "", at(10, 4, 0), 1_000),
        ];
        let out = aggregate(&records, Duration::minutes(5));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "p3");
        assert_eq!(out[1].amount, Money::from_cents(8_000));
        assert_eq!(out[1].timestamp, at(10, 0, 0));
    }

    #[test]
    fn aggregation_preserves_totals() {
        let records = vec![
            payment("p1", "张三", at(10, 0, 0), 5_000),
            payment("p2", "张三", at(10, 9, 0), -1_000),
            payment("p3", "李四", at(10, 1, 0), 700),
        ];
        let total: Money = records.iter().map(|r| r.amount).sum();
        let merged: Money = aggregate(&records, Duration::minutes(5)).iter().map(|r| r.amount).sum();
        assert_eq!(total, merged);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(aggregate::<PaymentRecord>(&[], Duration::minutes(5)).is_empty());
    }
}
