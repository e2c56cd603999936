//! Model Monitoring - stability and discrimination statistics for credit-risk PD models
//!
//! This library provides:
//! - Segment binning policies (SME, Wholesale, Mortgage) and expected distributions
//! - Population Stability Index against the development distribution
//! - Forward twelve-month Max DPD / Bad Flag derivation
//! - KS, AUROC and Gini over the deduplicated performance base
//! - CSV reports for every result

pub mod error;
pub mod segment;
pub mod account;
pub mod dedup;
pub mod psi;
pub mod performance;
pub mod discrimination;
pub mod report;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{MonitoringError, Result};
pub use segment::{BinningPolicy, PdGroup, Segment, SizeClass, WholesaleScheme};
pub use account::{AccountRecord, AccountSnapshot, SnapshotKind, SnapshotSchema};
pub use psi::{calculate_psi, PsiReport, PsiResult};
pub use performance::{build_performance_table, PerformanceBase, PerformanceRow, YearMonth};
pub use discrimination::{calculate_metrics, DiscriminationReport};
pub use config::MonitoringConfig;
pub use pipeline::MonitoringRunner;
