//! Max DPD / Bad Flag derivation over forward delinquency windows

mod period;
mod engine;
pub mod delinquency;

pub use period::YearMonth;
pub use engine::{
    bad_flag, build_performance_table, PerformanceBase, PerformanceRow, PerformanceTable,
};
pub use delinquency::{DelinquencySource, DelinquencyTable, DpdDirectory};

/// Length of the forward performance window in months
pub const FORWARD_MONTHS: usize = 12;

/// Max DPD strictly above this marks an account bad
pub const BAD_DPD_THRESHOLD: u32 = 90;
