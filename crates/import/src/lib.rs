//! Schema-less ingestion: finds the header in an arbitrary sheet, maps
//! semantic columns, and cleanses rows into ledger and payment records.

pub mod error;
pub mod grid;
pub mod header;
pub mod ledger;
pub mod mapping;
pub mod normalize;
pub mod payment;
pub mod report;
pub mod rules;

pub use error::ImportError;
pub use grid::read_csv_grid;
pub use header::detect_header_row;
pub use ledger::{process_ledger, LedgerProcessor};
pub use mapping::{find_column, resolve_mapping, ColumnMapping, Field, FieldSpec, LEDGER_FIELDS, PAYMENT_FIELDS};
pub use normalize::{parse_amount, parse_decimal, parse_timestamp};
pub use payment::{process_payments, PaymentProcessor};
pub use report::{DropReason, DroppedRow, Processed, Source, SourceReport};
pub use rules::CommissionRuleEngine;
