use tally_core::{cell_at, Cell, Channel, Direction, Money, PaymentRecord};
use tracing::{debug, info, instrument};

use crate::error::ImportError;
use crate::mapping::{resolve_mapping, ColumnMapping, Field, PAYMENT_FIELDS};
use crate::normalize::{parse_amount, parse_timestamp};
use crate::report::{DropReason, DroppedRow, Processed, Source, SourceReport};

/// Type marker of a WeChat merchant receipt.
pub const MERCHANT_COLLECTION: &str = "经营收款";

/// Withdrawals, red packets, transfers, top-ups, wealth products, fees.
pub const BLACKLIST_TYPES: &[&str] = &["提现", "红包", "转账", "充值", "理财", "服务费"];
pub const BLACKLIST_STATUS: &[&str] = &["关闭", "失败", "Refunded"];
/// Delivery platforms: pass-through spend, not shop revenue.
pub const BLACKLIST_COUNTERPARTY: &[&str] = &["美团", "饿了么"];

const EXPENDITURE_MARKER: &str = "支出";
const INCOME_MARKER: &str = "收入";
const REFUND_MARKER: &str = "退款";

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// The textual fields a row is filtered on.
#[derive(Debug, Clone, Default)]
pub struct PaymentRow {
    pub kind: String,
    pub direction: String,
    pub status: String,
    pub counterparty: String,
}

/// Runs the blacklist pipeline in order and resolves the signed amount.
/// The first failing stage decides the drop reason.
pub fn classify(
    channel: Channel,
    row: &PaymentRow,
    raw_amount: Money,
) -> Result<(Direction, Money), DropReason> {
    if channel.requires_merchant_collection() && !row.kind.contains(MERCHANT_COLLECTION) {
        return Err(DropReason::NotMerchantCollection(row.kind.clone()));
    }
    if contains_any(&row.kind, BLACKLIST_TYPES) {
        return Err(DropReason::BlacklistedType(row.kind.clone()));
    }
    if contains_any(&row.status, BLACKLIST_STATUS) {
        return Err(DropReason::BlacklistedStatus(row.status.clone()));
    }
    if contains_any(&row.counterparty, BLACKLIST_COUNTERPARTY) {
        return Err(DropReason::BlacklistedCounterparty(row.counterparty.clone()));
    }

    if row.direction.contains(EXPENDITURE_MARKER) {
        if row.kind.contains(REFUND_MARKER) {
            Ok((Direction::Expenditure, -raw_amount.abs()))
        } else {
            Err(DropReason::NonRefundExpenditure)
        }
    } else if row.direction.contains(INCOME_MARKER) {
        Ok((Direction::Income, raw_amount.abs()))
    } else if raw_amount.is_negative() {
        Ok((Direction::Expenditure, raw_amount))
    } else {
        Ok((Direction::Income, raw_amount))
    }
}

/// Cleanses one channel's statement grid into [`PaymentRecord`]s.
pub struct PaymentProcessor {
    channel: Channel,
}

impl PaymentProcessor {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    #[instrument(skip_all, fields(source = %self.channel))]
    pub fn process(
        &self,
        grid: &[Vec<Cell>],
        manual: Option<&ColumnMapping>,
    ) -> Result<Processed<PaymentRecord>, ImportError> {
        let source = Source::Payment(self.channel);
        let mapping = resolve_mapping(grid, manual, PAYMENT_FIELDS, source)?;
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
                    debug!(row = row_idx, %reason, "dropped payment row");
                    dropped.push(DroppedRow { row: row_idx, reason });
                }
            }
        }

        info!(
            header_row = mapping.header_row,
            total_rows = rows.len(),
            kept = records.len(),
            dropped = dropped.len(),
            "payment statement processed"
        );

        let report = SourceReport {
            source,
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
    ) -> Result<PaymentRecord, DropReason> {
        let col = |field: Field| cell_at(row, mapping.get(field));

        let timestamp = parse_timestamp(col(Field::Date)).ok_or(DropReason::InvalidDate)?;
        let raw_amount = parse_amount(col(Field::Amount));

        let fields = PaymentRow {
            kind: col(Field::Type).text(),
            direction: col(Field::Direction).text(),
            status: col(Field::Status).text(),
            counterparty: col(Field::Counterparty).text(),
        };
        let (direction, amount) = classify(self.channel, &fields, raw_amount)?;

        let origin_id = Some(col(Field::Id).text()).filter(|s| !s.is_empty());

        Ok(PaymentRecord {
            id: format!("{}-{row_idx}", self.channel.code()),
            timestamp,
            amount,
            kind: fields.kind,
            direction,
            counterparty: fields.counterparty,
            channel: self.channel,
            source_row: row_idx,
            raw_row: row.to_vec(),
            origin_id,
        })
    }
}

pub fn process_payments(
    grid: &[Vec<Cell>],
    channel: Channel,
    manual: Option<&ColumnMapping>,
) -> Result<Processed<PaymentRecord>, ImportError> {
    PaymentProcessor::new(channel).process(grid, manual)
}
