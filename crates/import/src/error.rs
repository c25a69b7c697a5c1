use thiserror::Error;

use crate::mapping::Field;
use crate::report::Source;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{input}: no header row found (fewer than 2 anchor keywords in the first 100 rows)")]
    HeaderNotFound { input: Source },
    #[error("{input}: header row {row} is outside the sheet ({rows} rows)")]
    HeaderRowOutOfRange { input: Source, row: usize, rows: usize },
    #[error("{input}: missing required column: {field}")]
    MissingColumn { input: Source, field: Field },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
