//! Monitoring runner
//!
//! Resolves the segment's binning policy once, then runs the stability and
//! performance pipelines against it. Each stage returns an owned result that
//! the next stage borrows.

use crate::account::{load_snapshot, AccountSnapshot, SnapshotKind};
use crate::config::MonitoringConfig;
use crate::dedup::{dedup_latest_assessment, dedup_worst_case};
use crate::discrimination::{calculate_metrics, DiscriminationReport};
use crate::error::Result;
use crate::performance::{
    build_performance_table, DelinquencySource, DpdDirectory, PerformanceBase, YearMonth,
};
use crate::psi::{calculate_psi, PsiReport};
use crate::segment::{BinningPolicy, Segment};
use std::path::Path;

/// Stability index over a deduplicated distribution snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PsiRun {
    pub segment: Segment,
    /// Rows in the snapshot as loaded
    pub input_rows: usize,
    /// Customers left after keeping the latest assessment
    pub customers: usize,
    pub report: PsiReport,
}

/// Joined performance base for the selected periods
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRun {
    pub segment: Segment,
    pub base: PerformanceBase,
}

/// Discrimination metrics over the worst-case performance rows
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminationRun {
    pub segment: Segment,
    /// Rows in the combined performance base
    pub input_rows: usize,
    /// Customers left after worst-case deduplication
    pub customers: usize,
    pub report: DiscriminationReport,
}

/// Runs monitoring stages for one segment
///
/// # Example
/// ```ignore
/// let runner = MonitoringRunner::new(Segment::Sme, MonitoringConfig::default());
/// let psi = runner.run_psi("distribution.csv")?;
/// let performance = runner.run_max_dpd("performance.csv", &periods, &dpd_months)?;
/// let gini = runner.run_discrimination(&performance.base)?;
/// ```
#[derive(Debug, Clone)]
pub struct MonitoringRunner {
    config: MonitoringConfig,
    policy: BinningPolicy,
}

impl MonitoringRunner {
    pub fn new(segment: Segment, config: MonitoringConfig) -> Self {
        let policy = BinningPolicy::resolve(segment, config.wholesale_scheme);
        Self { config, policy }
    }

    pub fn segment(&self) -> Segment {
        self.policy.segment()
    }

    pub fn policy(&self) -> &BinningPolicy {
        &self.policy
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Load a snapshot with this runner's schema and policy
    pub fn load<P: AsRef<Path>>(&self, path: P, kind: SnapshotKind) -> Result<AccountSnapshot> {
        load_snapshot(path, &self.config.schema, &self.policy, kind)
    }

    /// Load a distribution snapshot and compute its stability index
    pub fn run_psi<P: AsRef<Path>>(&self, snapshot_path: P) -> Result<PsiRun> {
        let snapshot = self.load(snapshot_path, SnapshotKind::Distribution)?;
        self.psi_for(&snapshot)
    }

    /// Stability index for an already loaded snapshot
    pub fn psi_for(&self, snapshot: &AccountSnapshot) -> Result<PsiRun> {
        let latest = dedup_latest_assessment(&snapshot.records);
        log::info!(
            "{} distribution: {} rows, {} customers after deduplication",
            self.segment(),
            snapshot.len(),
            latest.len()
        );
        let report = calculate_psi(&latest, &self.policy)?;
        Ok(PsiRun {
            segment: self.segment(),
            input_rows: snapshot.len(),
            customers: latest.len(),
            report,
        })
    }

    /// Load a performance snapshot and join it against the configured
    /// delinquency directory
    pub fn run_max_dpd<P: AsRef<Path>>(
        &self,
        snapshot_path: P,
        periods: &[YearMonth],
        dpd_months: &[YearMonth],
    ) -> Result<PerformanceRun> {
        let snapshot = self.load(snapshot_path, SnapshotKind::Performance)?;
        let source = DpdDirectory::new(&self.config.dpd_dir);
        self.performance_for(&snapshot, &source, periods, dpd_months)
    }

    /// Performance base for an already loaded snapshot and any delinquency source
    pub fn performance_for<S: DelinquencySource + ?Sized>(
        &self,
        snapshot: &AccountSnapshot,
        source: &S,
        periods: &[YearMonth],
        dpd_months: &[YearMonth],
    ) -> Result<PerformanceRun> {
        let base = build_performance_table(snapshot, source, periods, dpd_months)?;
        Ok(PerformanceRun {
            segment: self.segment(),
            base,
        })
    }

    /// KS, AUROC and Gini over the combined performance base
    pub fn run_discrimination(&self, base: &PerformanceBase) -> Result<DiscriminationRun> {
        let combined = base.combined();
        let worst = dedup_worst_case(&combined);
        let report = calculate_metrics(&worst, &self.policy)?;
        Ok(DiscriminationRun {
            segment: self.segment(),
            input_rows: combined.len(),
            customers: worst.len(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountRecord;
    use crate::performance::DelinquencyTable;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn account(customer: &str, account_no: &str, score: f64) -> AccountRecord {
        let mut r = AccountRecord::new(customer, Some(score));
        r.account_no = Some(account_no.to_string());
        r.open_date = NaiveDate::from_ymd_opt(2023, 1, 15);
        r
    }

    #[test]
    fn test_psi_for_dedups_before_binning() {
        let runner = MonitoringRunner::new(Segment::Sme, MonitoringConfig::default());
        let mut old = AccountRecord::new("C1", Some(0.08));
        old.final_pd_date = NaiveDate::from_ymd_opt(2022, 1, 1);
        let mut new = AccountRecord::new("C1", Some(0.005));
        new.final_pd_date = NaiveDate::from_ymd_opt(2023, 1, 1);
        let snapshot = AccountSnapshot {
            columns: vec![],
            records: vec![old, new, AccountRecord::new("C2", Some(0.02))],
        };

        let run = runner.psi_for(&snapshot).unwrap();
        assert_eq!(run.input_rows, 3);
        assert_eq!(run.customers, 2);
        match run.report {
            PsiReport::Single(result) => {
                assert_eq!(result.bins[0].total, 1);
                assert_eq!(result.bins[6].total, 0);
            }
            PsiReport::BySize(_) => panic!("SME is not split by size"),
        }
    }

    #[test]
    fn test_psi_counts_every_customer() {
        let runner = MonitoringRunner::new(Segment::Sme, MonitoringConfig::default());
        let snapshot = AccountSnapshot {
            columns: vec![],
            records: vec![
                AccountRecord::new("C1", Some(0.005)),
                AccountRecord::new("C2", None),
            ],
        };

        let run = runner.psi_for(&snapshot).unwrap();
        let total: usize = run.report.results().iter().map(|(_, r)| r.total()).sum();
        assert_eq!(total, run.customers);
        assert_eq!(run.customers, 2);
    }

    #[test]
    fn test_performance_then_discrimination() {
        let runner = MonitoringRunner::new(Segment::Sme, MonitoringConfig::default());
        let snapshot = AccountSnapshot {
            columns: vec!["zacno".to_string()],
            records: vec![
                account("C1", "A1", 0.005),
                account("C1", "A1b", 0.005),
                account("C2", "A2", 0.090),
                account("C3", "A3", 0.010),
            ],
        };
        let months = ym(2023, 1).forward_window();
        let mut source: HashMap<YearMonth, DelinquencyTable> = HashMap::new();
        source.insert(
            months[3],
            [("A1", 0u32), ("A1b", 120), ("A2", 95), ("A3", 0)]
                .into_iter()
                .collect(),
        );

        let performance = runner
            .performance_for(&snapshot, &source, &[ym(2023, 1)], &months)
            .unwrap();
        assert_eq!(performance.base.row_count(), 4);

        let gini = runner.run_discrimination(&performance.base).unwrap();
        assert_eq!(gini.input_rows, 4);
        assert_eq!(gini.customers, 3);
        // C1 keeps its bad account
        let c1 = gini
            .report
            .labeled
            .iter()
            .find(|l| l.row.account.customer_id == "C1")
            .unwrap();
        assert_eq!(c1.row.bad_flag, 1);
    }
}
