use tally_core::ConfigError;
use tally_import::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("ledger produced no usable records")]
    EmptyLedger,
    #[error("payment sources produced no usable records")]
    NoPaymentRecords,
}
