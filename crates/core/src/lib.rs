pub mod cell;
pub mod config;
pub mod money;
pub mod period;
pub mod record;

pub use cell::{cell_at, Cell, Grid};
pub use config::{CommissionRule, ConfigError, ReconciliationConfig};
pub use money::Money;
pub use period::{DateRange, ReportingPeriod};
pub use record::{Channel, Direction, LedgerCategory, LedgerRecord, PaymentRecord};
