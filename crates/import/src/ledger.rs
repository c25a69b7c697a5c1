use rust_decimal::Decimal;
use tally_core::{cell_at, Cell, LedgerRecord, Money, ReconciliationConfig};
use tracing::{debug, info, instrument};

use crate::error::ImportError;
use crate::mapping::{resolve_mapping, ColumnMapping, Field, LEDGER_FIELDS};
use crate::normalize::{parse_decimal, parse_timestamp};
use crate::report::{DropReason, DroppedRow, Processed, Source, SourceReport};
use crate::rules::CommissionRuleEngine;

/// Transaction-type fragment marking a cash payment.
pub const CASH_KEYWORD: &str = "现金";
/// Transaction-type fragment marking a deposit top-up (covers "押金充值").
pub const RECHARGE_KEYWORD: &str = "充值";

const UNKNOWN: &str = "Unknown";
const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn is_recharge(kind: &str) -> bool {
    kind.contains(RECHARGE_KEYWORD)
}

/// Cleanses ledger (ERP) grids into [`LedgerRecord`]s.
pub struct LedgerProcessor {
    commission: CommissionRuleEngine,
}

impl LedgerProcessor {
    pub fn new(config: &ReconciliationConfig) -> Self {
        Self {
            commission: CommissionRuleEngine::new(config.commission_rules.clone()),
        }
    }

    #[instrument(skip_all, fields(source = "ledger"))]
    pub fn process(
        &self,
        grid: &[Vec<Cell>],
        manual: Option<&ColumnMapping>,
    ) -> Result<Processed<LedgerRecord>, ImportError> {
        let mapping = resolve_mapping(grid, manual, LEDGER_FIELDS, Source::Ledger)?;
        let first_data_row = mapping.header_row + 1;
        let rows = grid.get(first_data_row..).unwrap_or_default();

        let mut records = Vec::new();
        let mut dropped = Vec::new();

        for (offset, row) in rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let row_idx = first_data_row + offset;
            match self.process_row(row, row_idx, &mapping) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!(row = row_idx, %reason, "dropped ledger row");
                    dropped.push(DroppedRow { row: row_idx, reason });
                }
            }
        }

        info!(
            header_row = mapping.header_row,
            total_rows = rows.len(),
            kept = records.len(),
            dropped = dropped.len(),
            "ledger processed"
        );

        let report = SourceReport {
            source: Source::Ledger,
            header_row: Some(mapping.header_row),
            total_rows: rows.len(),
            kept: records.len(),
            dropped,
        };
        Ok(Processed { records, report })
    }

    fn process_row(
        &self,
        row: &[Cell],
        row_idx: usize,
        mapping: &ColumnMapping,
    ) -> Result<LedgerRecord, DropReason> {
        let col = |field: Field| cell_at(row, mapping.get(field));

        let timestamp = parse_timestamp(col(Field::Date));
        // Net and commission are computed on the unrounded cells and rounded once.
        let raw_amount = parse_decimal(col(Field::Amount));
        let raw_deposit = parse_decimal(col(Field::Deposit));
        let amount = Money::from_decimal(raw_amount - raw_deposit);
        let deposit = Money::from_decimal(raw_deposit);

        let kind = text_or(col(Field::Type), UNKNOWN);
        let is_cash =
            kind.contains(CASH_KEYWORD) || parse_decimal(col(Field::Cash)) > Decimal::ZERO;

        let Some(timestamp) = timestamp else {
            return Err(DropReason::InvalidDate);
        };
        if amount.is_zero() && raw_deposit.abs() < CENT && !is_cash {
            return Err(DropReason::NoFinancialSubstance);
        }

        let client = text_or(col(Field::Client), UNKNOWN);
        let remark = col(Field::Remark).text();
        let phone = col(Field::Phone).text();
        let id = Some(col(Field::Id).text())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("ERP-{row_idx}"));

        let (commission, sales_amount) = if is_recharge(&kind) {
            (Money::ZERO, Money::ZERO)
        } else {
            (
                self.commission.commission_for(&remark, raw_amount),
                Money::from_decimal(amount.amount() + raw_deposit),
            )
        };

        Ok(LedgerRecord {
            id,
            timestamp,
            amount,
            deposit,
            sales_amount,
            kind,
            client,
            remark,
            phone,
            is_cash,
            commission,
        })
    }
}

fn text_or(cell: &Cell, default: &str) -> String {
    let text = cell.text();
    if text.is_empty() {
        default.to_string()
    } else {
        text
    }
}

/// Convenience wrapper building a [`LedgerProcessor`] for one grid.
pub fn process_ledger(
    grid: &[Vec<Cell>],
    config: &ReconciliationConfig,
    manual: Option<&ColumnMapping>,
) -> Result<Processed<LedgerRecord>, ImportError> {
    LedgerProcessor::new(config).process(grid, manual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    const HEADER: &[&str] = &["支付序号", "支付日期", "客户名", "交易类型", "实收额", "押金", "备注", "电话 1"];

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn grid(data: &[&[&str]]) -> Vec<Vec<Cell>> {
        let mut g = vec![row(&["门店收银日报"]), row(HEADER)];
        g.extend(data.iter().map(|r| row(r)));
        g
    }

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn process(data: &[&[&str]]) -> Processed<LedgerRecord> {
        process_ledger(&grid(data), &ReconciliationConfig::default(), None).unwrap()
    }

    #[test]
    fn basic_service_row() {
        let out = process(&[&["S001", "2024-05-01 10:00", "张三", "服务", "100", "0", "", "13800000000"]]);
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.id, "S001");
        assert_eq!(r.timestamp, ts(10, 0));
        assert_eq!(r.amount, Money::from_cents(10_000));
        assert_eq!(r.sales_amount, Money::from_cents(10_000));
        assert!(!r.is_cash);
        assert_eq!(out.report.header_row, Some(1));
    }

    #[test]
    fn deposit_is_deducted_from_net() {
        let out = process(&[&["S002", "2024-05-01 11:00", "李四", "服务", "¥1,000.00", "300.50", "", ""]]);
        let r = &out.records[0];
        assert_eq!(r.amount, Money::from_cents(69_950));
        assert_eq!(r.deposit, Money::from_cents(30_050));
        assert_eq!(r.sales_amount, Money::from_cents(100_000));
    }

    #[test]
    fn deposit_only_row_is_kept() {
        let out = process(&[&["S003", "2024-05-01 12:00", "王五", "服务", "200", "200", "", ""]]);
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].amount.is_zero());
    }

    #[test]
    fn zero_value_row_is_dropped() {
        let out = process(&[&["S004", "2024-05-01 12:00", "王五", "服务", "0", "0", "", ""]]);
        assert!(out.records.is_empty());
        assert_eq!(out.report.dropped[0].reason, DropReason::NoFinancialSubstance);
        assert_eq!(out.report.dropped[0].row, 2);
    }

    #[test]
    fn zero_value_cash_row_is_kept() {
        let out = process(&[&["S005", "2024-05-01 12:00", "王五", "现金", "0", "0", "", ""]]);
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].is_cash);
    }

    #[test]
    fn invalid_date_is_dropped() {
        let out = process(&[&["合计", "", "", "", "5000", "0", "", ""]]);
        assert!(out.records.is_empty());
        assert_eq!(out.report.dropped[0].reason, DropReason::InvalidDate);
    }

    #[test]
    fn cash_column_marks_cash() {
        let header = row(&["支付日期", "实收额", "现金", "交易类型"]);
        let g = vec![header, row(&["2024-05-01 10:00", "80", "80", "服务"])];
        let out = process_ledger(&g, &ReconciliationConfig::default(), None).unwrap();
        assert!(out.records[0].is_cash);
        assert_eq!(out.records[0].client, "Unknown");
        assert_eq!(out.records[0].id, "ERP-1");
    }

    #[test]
    fn commission_uses_raw_amount_and_first_rule() {
        let out = process(&[&["S006", "2024-05-01 13:00", "赵六", "服务", "200", "100", "谢老师 洗吹", ""]]);
        let r = &out.records[0];
        // 洗 is listed first at 10% of the raw 200.
        assert_eq!(r.commission, Money::from_cents(2_000));
        assert_eq!(r.amount, Money::from_cents(10_000));
    }

    #[test]
    fn recharge_has_no_commission_or_sales() {
        let out = process(&[&["S007", "2024-05-01 14:00", "赵六", "押金充值", "500", "0", "谢", ""]]);
        let r = &out.records[0];
        assert!(r.commission.is_zero());
        assert!(r.sales_amount.is_zero());
        assert_eq!(r.amount, Money::from_cents(50_000));
    }

    #[test]
    fn net_amount_invariant_holds() {
        let out = process(&[
            &["A", "2024-05-01 10:00", "c", "服务", "10.10", "0.05", "", ""],
            &["B", "2024-05-01 10:00", "c", "服务", "150-", "0", "", ""],
            &["C", "2024-05-01 10:00", "c", "服务", "99.999", "0", "", ""],
        ]);
        let nets: Vec<i64> = out.records.iter().map(|r| r.amount.to_cents()).collect();
        assert_eq!(nets, vec![1005, -15000, 10000]);
    }

    #[test]
    fn sub_cent_inputs_round_after_subtraction() {
        let out = process(&[
            &["A", "2024-05-01 10:00", "c", "服务", "0.005", "0.004", "", ""],
            &["B", "2024-05-01 10:00", "c", "服务", "10.006", "0.004", "", ""],
            &["C", "2024-05-01 10:00", "c", "服务", "0.045", "0", "洗", ""],
        ]);
        // 0.001 net and a sub-cent deposit: nothing left to reconcile.
        assert_eq!(out.report.dropped.len(), 1);
        assert_eq!(out.report.dropped[0].row, 2);
        assert_eq!(out.report.dropped[0].reason, DropReason::NoFinancialSubstance);

        let b = &out.records[0];
        assert_eq!(b.amount, Money::from_cents(1_000));
        assert!(b.deposit.is_zero());
        assert_eq!(b.sales_amount, Money::from_cents(1_000));

        // 10% of 0.045 is 0.0045, which rounds to zero.
        let c = &out.records[1];
        assert_eq!(c.amount, Money::from_cents(5));
        assert!(c.commission.is_zero());
    }

    #[test]
    fn empty_rows_are_skipped_silently() {
        let mut g = grid(&[&["S001", "2024-05-01 10:00", "张三", "服务", "100", "0", "", ""]]);
        g.push(Vec::new());
        let out = process_ledger(&g, &ReconciliationConfig::default(), None).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.report.dropped.is_empty());
        assert_eq!(out.report.total_rows, 2);
    }

    #[test]
    fn missing_header_is_fatal() {
        let g = vec![row(&["foo"]), row(&["bar"])];
        assert!(matches!(
            process_ledger(&g, &ReconciliationConfig::default(), None),
            Err(ImportError::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn manual_mapping_is_honoured() {
        let g = vec![
            row(&["col a", "col b", "col c"]),
            row(&["张三", "2024-05-01 10:00", "66"]),
        ];
        let manual = ColumnMapping::new(0)
            .with(Field::Date, 1)
            .with(Field::Amount, 2)
            .with(Field::Client, 0);
        let out = process_ledger(&g, &ReconciliationConfig::default(), Some(&manual)).unwrap();
        assert_eq!(out.records[0].client, "张三");
        assert_eq!(out.records[0].amount, Money::from_cents(6_600));
    }
}
