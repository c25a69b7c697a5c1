use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tally_core::Cell;

use crate::error::ImportError;
use crate::header::detect_header_row;
use crate::report::Source;

/// Semantic columns the processors know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Amount,
    Deposit,
    Cash,
    Type,
    Client,
    Remark,
    Phone,
    Id,
    Direction,
    Status,
    Counterparty,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Date => "date",
            Field::Amount => "amount",
            Field::Deposit => "deposit",
            Field::Cash => "cash",
            Field::Type => "type",
            Field::Client => "client",
            Field::Remark => "remark",
            Field::Phone => "phone",
            Field::Id => "id",
            Field::Direction => "direction",
            Field::Status => "status",
            Field::Counterparty => "counterparty",
        };
        f.write_str(name)
    }
}

/// How to find one field among a sheet's header labels.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub candidates: &'static [&'static str],
    /// A header containing any of these is never a candidate.
    pub exclude: &'static [&'static str],
    pub required: bool,
}

const fn spec(
    field: Field,
    candidates: &'static [&'static str],
    exclude: &'static [&'static str],
    required: bool,
) -> FieldSpec {
    FieldSpec { field, candidates, exclude, required }
}

pub const LEDGER_FIELDS: &[FieldSpec] = &[
    spec(Field::Date, &["支付日期", "Date", "Time", "时间", "日期"], &[], true),
    spec(Field::Amount, &["实收额", "Amount", "Price", "金额", "实收"], &["押金"], true),
    spec(Field::Deposit, &["押金", "Deposit", "储值"], &[], false),
    spec(Field::Cash, &["现金", "Cash"], &[], false),
    spec(Field::Type, &["交易类型", "Type", "类型"], &[], false),
    spec(Field::Client, &["客户名", "Client", "Name", "客户"], &[], false),
    spec(Field::Remark, &["备注", "Remark", "Note", "说明"], &[], false),
    spec(Field::Phone, &["电话 1", "电话", "Phone", "Mobile"], &[], false),
    spec(Field::Id, &["支付序号", "ID", "Order", "单号"], &[], false),
];

pub const PAYMENT_FIELDS: &[FieldSpec] = &[
    spec(Field::Date, &["交易时间", "时间", "Time", "Date", "日期"], &[], true),
    spec(Field::Amount, &["金额", "Amount", "Price", "实收"], &[], true),
    spec(
        Field::Type,
        &["商品说明", "交易类型", "类型", "Type", "商品", "名称", "业务描述", "交易分类"],
        &["收支"],
        false,
    ),
    spec(
        Field::Direction,
        &["收/支", "收支类型", "收支", "Direction", "Status", "资金流向"],
        &[],
        false,
    ),
    spec(Field::Status, &["交易状态", "状态", "Status", "当前状态"], &[], false),
    spec(
        Field::Counterparty,
        &["交易对方", "对方", "Counterparty", "明细名称", "商品名称", "Name"],
        &[],
        false,
    ),
    spec(
        Field::Id,
        &["交易订单号", "商家订单号", "交易单号", "单号", "Order ID", "Transaction ID"],
        &[],
        false,
    ),
];

/// Column index for a field: exact (trimmed) header match first, then the
/// first header containing a candidate. Scans in header order both times.
pub fn find_column(headers: &[String], candidates: &[&str], exclude: &[&str]) -> Option<usize> {
    let eligible = |h: &String| !h.is_empty() && !exclude.iter().any(|ex| h.contains(ex));

    headers
        .iter()
        .position(|h| eligible(h) && candidates.contains(&h.as_str()))
        .or_else(|| {
            headers
                .iter()
                .position(|h| eligible(h) && candidates.iter().any(|c| h.contains(c)))
        })
}

/// Where each field lives in one grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub header_row: usize,
    #[serde(default)]
    pub columns: BTreeMap<Field, usize>,
}

impl ColumnMapping {
    pub fn new(header_row: usize) -> Self {
        ColumnMapping { header_row, columns: BTreeMap::new() }
    }

    pub fn with(mut self, field: Field, column: usize) -> Self {
        self.columns.insert(field, column);
        self
    }

    /// Maps every spec against the labels of `grid[header_row]`.
    pub fn detect(grid: &[Vec<Cell>], header_row: usize, specs: &[FieldSpec]) -> Self {
        let headers: Vec<String> = grid
            .get(header_row)
            .map(|row| row.iter().map(Cell::text).collect())
            .unwrap_or_default();

        let columns = specs
            .iter()
            .filter_map(|s| find_column(&headers, s.candidates, s.exclude).map(|c| (s.field, c)))
            .collect();

        ColumnMapping { header_row, columns }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn is_mapped(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }
}

/// Uses the manual mapping when given, otherwise sniffs the header and maps
/// the specs. Fails when a required field is left unmapped.
pub fn resolve_mapping(
    grid: &[Vec<Cell>],
    manual: Option<&ColumnMapping>,
    specs: &[FieldSpec],
    input: Source,
) -> Result<ColumnMapping, ImportError> {
    let mapping = match manual {
        Some(m) => {
            if m.header_row >= grid.len() {
                return Err(ImportError::HeaderRowOutOfRange {
                    input,
                    row: m.header_row,
                    rows: grid.len(),
                });
            }
            m.clone()
        }
        None => {
            let header_row =
                detect_header_row(grid).ok_or(ImportError::HeaderNotFound { input })?;
            ColumnMapping::detect(grid, header_row, specs)
        }
    };

    if let Some(missing) = specs.iter().find(|s| s.required && !mapping.is_mapped(s.field)) {
        return Err(ImportError::MissingColumn { input, field: missing.field });
    }

    Ok(mapping)
}
