//! Discrimination metrics: KS, AUROC and Gini
//!
//! Accounts are grouped by PD group and the groups are walked from the
//! riskiest (7) down to the safest (1), accumulating the share of bad and
//! good accounts seen so far.
//!
//! - KS at a group is the gap between the *next* group's cumulative good and
//!   cumulative bad shares, zero at the last group; KS is the maximum.
//! - Each group adds `0.5·p_good·p_bad + (1 - cum_good)·p_bad` to AUROC.
//! - Gini = 2·AUROC - 1.

use crate::error::{MonitoringError, Result};
use crate::performance::PerformanceRow;
use crate::segment::{BinningPolicy, PdGroup, NUM_BINS};
use serde::Serialize;

/// Metrics for one PD group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiniBinRow {
    pub pd_group: PdGroup,
    pub bad: usize,
    pub good: usize,
    pub total: usize,
    /// Undefined for an empty group
    pub bad_rate: Option<f64>,
    pub prop_bad: f64,
    pub prop_good: f64,
    pub prop_total: f64,
    pub cum_bad: f64,
    pub cum_good: f64,
    pub cum_total: f64,
    pub ks: f64,
    pub roc: f64,
}

/// A performance row with the PD group it was scored into
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub row: PerformanceRow,
    pub pd_group: PdGroup,
}

/// KS, AUROC and Gini with their per-group working
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminationReport {
    pub labeled: Vec<LabeledRow>,
    /// Groups in descending order, riskiest first
    pub bins: Vec<GiniBinRow>,
    pub ks: f64,
    pub auroc: f64,
    pub gini: f64,
}

impl DiscriminationReport {
    pub fn ks_pct(&self) -> f64 {
        as_percent(self.ks)
    }

    pub fn auroc_pct(&self) -> f64 {
        as_percent(self.auroc)
    }

    pub fn gini_pct(&self) -> f64 {
        as_percent(self.gini)
    }
}

/// Percentage rounded to two decimals, for display only
pub fn as_percent(value: f64) -> f64 {
    (value * 10_000.0).round() / 100.0
}

/// Per-group metrics and scalars from bad and good counts indexed by group
pub fn metrics_from_counts(
    bad: &[usize; NUM_BINS],
    good: &[usize; NUM_BINS],
) -> Result<(Vec<GiniBinRow>, f64, f64, f64)> {
    let total_bad: usize = bad.iter().sum();
    let total_good: usize = good.iter().sum();
    if total_bad == 0 || total_good == 0 {
        return Err(MonitoringError::InsufficientData(format!(
            "discrimination needs both bad and good accounts (bad {}, good {})",
            total_bad, total_good
        )));
    }
    let total_all = (total_bad + total_good) as f64;

    let mut bins: Vec<GiniBinRow> = Vec::with_capacity(NUM_BINS);
    let (mut cum_bad, mut cum_good, mut cum_total) = (0.0, 0.0, 0.0);

    for group in PdGroup::all().rev() {
        let i = group.index();
        let total = bad[i] + good[i];
        let prop_bad = bad[i] as f64 / total_bad as f64;
        let prop_good = good[i] as f64 / total_good as f64;
        let prop_total = total as f64 / total_all;
        cum_bad += prop_bad;
        cum_good += prop_good;
        cum_total += prop_total;

        bins.push(GiniBinRow {
            pd_group: group,
            bad: bad[i],
            good: good[i],
            total,
            bad_rate: (total > 0).then(|| bad[i] as f64 / total as f64),
            prop_bad,
            prop_good,
            prop_total,
            cum_bad,
            cum_good,
            cum_total,
            ks: 0.0,
            roc: 0.5 * prop_good * prop_bad + (1.0 - cum_good) * prop_bad,
        });
    }

    for i in 0..bins.len() {
        bins[i].ks = match bins.get(i + 1) {
            Some(next) => (next.cum_good - next.cum_bad).abs(),
            None => 0.0,
        };
    }

    let ks = bins.iter().map(|b| b.ks).fold(0.0, f64::max);
    let auroc: f64 = bins.iter().map(|b| b.roc).sum();
    let gini = 2.0 * auroc - 1.0;

    Ok((bins, ks, auroc, gini))
}

/// Calculate KS, AUROC and Gini over a deduplicated performance base.
///
/// Rows without a score are dropped before grouping.
pub fn calculate_metrics(
    rows: &[PerformanceRow],
    policy: &BinningPolicy,
) -> Result<DiscriminationReport> {
    let binning = policy.performance();
    let mut labeled = Vec::with_capacity(rows.len());
    let mut bad = [0usize; NUM_BINS];
    let mut good = [0usize; NUM_BINS];

    for (i, row) in rows.iter().enumerate() {
        let Some(group) = row.account.pd_group(binning, i + 1)? else {
            continue;
        };
        if row.is_bad() {
            bad[group.index()] += 1;
        } else {
            good[group.index()] += 1;
        }
        labeled.push(LabeledRow {
            row: row.clone(),
            pd_group: group,
        });
    }

    let dropped = rows.len() - labeled.len();
    if dropped > 0 {
        log::warn!("{} performance rows without a score dropped", dropped);
    }
    if labeled.is_empty() {
        return Err(MonitoringError::InsufficientData(
            "no scored rows in the performance base".to_string(),
        ));
    }

    let (bins, ks, auroc, gini) = metrics_from_counts(&bad, &good)?;
    log::info!(
        "{} discrimination over {} accounts: KS {:.2}%, AUROC {:.2}%, Gini {:.2}%",
        policy.segment(),
        labeled.len(),
        as_percent(ks),
        as_percent(auroc),
        as_percent(gini)
    );

    Ok(DiscriminationReport {
        labeled,
        bins,
        ks,
        auroc,
        gini,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountRecord;
    use crate::performance::{YearMonth, FORWARD_MONTHS};
    use crate::segment::{Segment, SizeClass, WholesaleScheme};
    use approx::assert_relative_eq;

    const BAD: [usize; NUM_BINS] = [0, 0, 0, 1, 2, 5, 10];
    const GOOD: [usize; NUM_BINS] = [100, 90, 70, 40, 20, 8, 2];

    fn row(customer: &str, score: Option<f64>, bad: bool) -> PerformanceRow {
        PerformanceRow {
            period: YearMonth::new(2023, 1).unwrap(),
            account: AccountRecord::new(customer, score),
            dpd: [None; FORWARD_MONTHS],
            max_dpd: Some(if bad { 120 } else { 0 }),
            bad_flag: u8::from(bad),
        }
    }

    #[test]
    fn test_reference_example() {
        let (bins, ks, auroc, gini) = metrics_from_counts(&BAD, &GOOD).unwrap();

        assert_relative_eq!(auroc, 581.0 / 594.0, epsilon = 1e-12);
        assert_relative_eq!(gini, 284.0 / 297.0, epsilon = 1e-12);
        assert_relative_eq!(ks, 169.0 / 198.0, epsilon = 1e-12);

        // Riskiest group first
        assert_eq!(bins[0].pd_group.label(), 7);
        assert_eq!(bins[6].pd_group.label(), 1);
        assert_eq!(bins[6].ks, 0.0);
        assert_relative_eq!(bins[6].cum_bad, 1.0, epsilon = 1e-12);
        assert_relative_eq!(bins[6].cum_good, 1.0, epsilon = 1e-12);
        assert_relative_eq!(bins[6].cum_total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ks_uses_next_group() {
        let (bins, _, _, _) = metrics_from_counts(&BAD, &GOOD).unwrap();
        let expected = (bins[1].cum_good - bins[1].cum_bad).abs();
        assert_relative_eq!(bins[0].ks, expected, epsilon = 1e-15);
    }

    #[test]
    fn test_counts_are_preserved() {
        let (bins, ks, auroc, gini) = metrics_from_counts(&BAD, &GOOD).unwrap();
        assert_eq!(bins.iter().map(|b| b.bad).sum::<usize>(), 18);
        assert_eq!(bins.iter().map(|b| b.good).sum::<usize>(), 330);
        assert!((0.0..=1.0).contains(&ks));
        assert!((0.0..=1.0).contains(&auroc));
        assert!((-1.0..=1.0).contains(&gini));
    }

    #[test]
    fn test_empty_group_has_no_bad_rate() {
        let bad = [0, 0, 0, 0, 0, 1, 1];
        let good = [0, 3, 3, 3, 3, 3, 1];
        let (bins, _, _, _) = metrics_from_counts(&bad, &good).unwrap();
        let g1 = bins.iter().find(|b| b.pd_group.label() == 1).unwrap();
        assert_eq!(g1.total, 0);
        assert_eq!(g1.bad_rate, None);
        assert_eq!(bins[0].bad_rate, Some(0.5));
    }

    #[test]
    fn test_perfect_separation() {
        let bad = [0, 0, 0, 0, 0, 0, 4];
        let good = [4, 0, 0, 0, 0, 0, 0];
        let (_, _, auroc, gini) = metrics_from_counts(&bad, &good).unwrap();
        assert_relative_eq!(auroc, 1.0, epsilon = 1e-12);
        assert_relative_eq!(gini, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_bads_is_insufficient() {
        let err = metrics_from_counts(&[0; NUM_BINS], &GOOD).unwrap_err();
        assert!(matches!(err, MonitoringError::InsufficientData(_)));
    }

    #[test]
    fn test_calculate_metrics_from_rows() {
        let policy = BinningPolicy::resolve(Segment::Sme, WholesaleScheme::default());
        let rows = vec![
            row("C1", Some(0.005), false),
            row("C2", Some(0.005), false),
            row("C3", Some(0.020), false),
            row("C4", Some(0.020), true),
            row("C5", Some(0.090), true),
            row("C6", None, true),
        ];
        let report = calculate_metrics(&rows, &policy).unwrap();

        assert_eq!(report.labeled.len(), 5);
        assert_eq!(report.bins.iter().map(|b| b.bad).sum::<usize>(), 2);
        assert_eq!(report.bins.iter().map(|b| b.good).sum::<usize>(), 3);

        let g4 = report.bins.iter().find(|b| b.pd_group.label() == 4).unwrap();
        assert_eq!((g4.bad, g4.good), (1, 1));
        assert!(report.gini > 0.0);
    }

    fn graded(customer: &str, grade: &str, bad: bool) -> PerformanceRow {
        let mut r = row(customer, None, bad);
        r.account.grade = Some(grade.to_string());
        r.account.size = Some(SizeClass::Large);
        r
    }

    #[test]
    fn test_calculate_metrics_by_grade() {
        let policy = BinningPolicy::resolve(Segment::Wholesale, WholesaleScheme::CategoricalGrade);
        let rows = vec![
            graded("W1", "AAA", false),
            graded("W2", "A", false),
            graded("W3", "BB", true),
            graded("W4", "CCC", true),
            graded("W5", "BBB", false),
        ];
        let report = calculate_metrics(&rows, &policy).unwrap();

        assert_eq!(report.labeled.len(), 5);
        let group_of = |label: u8| report.bins.iter().find(|b| b.pd_group.label() == label).unwrap();
        assert_eq!((group_of(1).bad, group_of(1).good), (0, 1));
        assert_eq!((group_of(4).bad, group_of(4).good), (1, 0));
        assert_eq!((group_of(7).bad, group_of(7).good), (1, 0));
        // Bads sit strictly above goods, so the ranking is perfect
        assert_relative_eq!(report.auroc, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_grade_is_invalid_value() {
        let policy = BinningPolicy::resolve(Segment::Wholesale, WholesaleScheme::CategoricalGrade);
        let rows = vec![graded("W1", "AAA", false), graded("W2", "ZZ", true)];
        let err = calculate_metrics(&rows, &policy).unwrap_err();
        match err {
            MonitoringError::InvalidValue { column, row, value } => {
                assert_eq!(column, "Grade");
                assert_eq!(row, 2);
                assert_eq!(value, "ZZ");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(as_percent(0.956228956), 95.62);
        assert_eq!(as_percent(0.5), 50.0);
    }
}
