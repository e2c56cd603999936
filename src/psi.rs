//! Population Stability Index
//!
//! Compares the current PD group mix with the development-sample
//! distribution:
//!
//! ```text
//! PSI = Σ (actual_g - expected_g) · ln(actual_g / expected_g)
//! ```
//!
//! A group where the log ratio is undefined (no accounts, or no expected
//! weight) contributes zero instead of failing the whole index.

use crate::account::AccountRecord;
use crate::error::{MonitoringError, Result};
use crate::segment::{BinningPolicy, ExpectedDistribution, PdGroup, SizeClass, NUM_BINS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// PSI contribution of one PD group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsiBinRow {
    pub pd_group: PdGroup,
    pub total: usize,
    pub actual_pct: f64,
    pub expected: f64,
    pub log_ratio: f64,
    pub index: f64,
}

/// Stability index over one population
#[derive(Debug, Clone, PartialEq)]
pub struct PsiResult {
    pub psi: f64,
    /// All seven groups in ascending order
    pub bins: Vec<PsiBinRow>,
    /// Groups whose log ratio was undefined and forced to zero
    pub degenerate_bins: Vec<PdGroup>,
}

impl PsiResult {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.total).sum()
    }
}

/// PSI for a segment; Wholesale is reported per size class
#[derive(Debug, Clone, PartialEq)]
pub enum PsiReport {
    Single(PsiResult),
    BySize(BTreeMap<SizeClass, PsiResult>),
}

impl PsiReport {
    /// Each result with its size class, if any
    pub fn results(&self) -> Vec<(Option<SizeClass>, &PsiResult)> {
        match self {
            PsiReport::Single(result) => vec![(None, result)],
            PsiReport::BySize(by_size) => by_size.iter().map(|(s, r)| (Some(*s), r)).collect(),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// ln(actual / expected), or None where it is not a finite number
fn guarded_log_ratio(actual: f64, expected: f64) -> Option<f64> {
    if actual <= 0.0 || expected <= 0.0 {
        return None;
    }
    let value = (actual / expected).ln();
    value.is_finite().then_some(value)
}

/// PSI from group counts against an expected distribution
pub fn psi_from_counts(counts: &[usize; NUM_BINS], expected: &ExpectedDistribution) -> PsiResult {
    let total: usize = counts.iter().sum();
    let mut bins = Vec::with_capacity(NUM_BINS);
    let mut degenerate_bins = Vec::new();

    for group in PdGroup::all() {
        let count = counts[group.index()];
        let actual_pct = ratio(count as f64, total as f64);
        let expected_pct = expected.get(group);
        let log_ratio = guarded_log_ratio(actual_pct, expected_pct).unwrap_or_else(|| {
            log::debug!(
                "PD group {}: log ratio undefined (actual {}, expected {}), using 0",
                group,
                actual_pct,
                expected_pct
            );
            degenerate_bins.push(group);
            0.0
        });

        bins.push(PsiBinRow {
            pd_group: group,
            total: count,
            actual_pct,
            expected: expected_pct,
            log_ratio,
            index: (actual_pct - expected_pct) * log_ratio,
        });
    }

    let psi = bins.iter().map(|b| b.index).sum();
    PsiResult {
        psi,
        bins,
        degenerate_bins,
    }
}

/// Calculate PSI for a deduplicated snapshot.
///
/// Records without a score fall in group 7, so every deduplicated record
/// is counted once. Wholesale records are split by size class and each class
/// is compared with its own expected distribution.
pub fn calculate_psi(records: &[AccountRecord], policy: &BinningPolicy) -> Result<PsiReport> {
    let binning = policy.stability();
    let mut counts: BTreeMap<Option<SizeClass>, [usize; NUM_BINS]> = BTreeMap::new();
    let mut unscored = 0usize;

    for (i, record) in records.iter().enumerate() {
        let size = if policy.requires_size() {
            Some(record.size.ok_or_else(|| {
                MonitoringError::config(format!(
                    "{} account for customer '{}' has no size class",
                    policy.segment(),
                    record.customer_id
                ))
            })?)
        } else {
            None
        };

        let group = record.pd_group(binning, i + 1)?.unwrap_or_else(|| {
            unscored += 1;
            PdGroup::HIGHEST
        });
        counts.entry(size).or_insert([0; NUM_BINS])[group.index()] += 1;
    }

    if unscored > 0 {
        log::warn!("{} accounts without a score placed in PD group {}", unscored, PdGroup::HIGHEST);
    }
    if counts.values().flatten().sum::<usize>() == 0 {
        return Err(MonitoringError::InsufficientData(
            "no scored accounts for the stability index".to_string(),
        ));
    }

    if policy.requires_size() {
        let mut by_size = BTreeMap::new();
        for size in SizeClass::ALL {
            let class_counts = counts.get(&Some(size)).copied().unwrap_or([0; NUM_BINS]);
            if class_counts.iter().all(|&c| c == 0) {
                log::warn!("No {} accounts in the {} snapshot", size, policy.segment());
            }
            let result = psi_from_counts(&class_counts, policy.expected(Some(size))?);
            log::info!("PSI {} {}: {:.4}", policy.segment(), size, result.psi);
            by_size.insert(size, result);
        }
        Ok(PsiReport::BySize(by_size))
    } else {
        let class_counts = counts.get(&None).copied().unwrap_or([0; NUM_BINS]);
        let result = psi_from_counts(&class_counts, policy.expected(None)?);
        log::info!("PSI {}: {:.4}", policy.segment(), result.psi);
        Ok(PsiReport::Single(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, WholesaleScheme};
    use approx::assert_relative_eq;

    fn sme() -> BinningPolicy {
        BinningPolicy::resolve(Segment::Sme, WholesaleScheme::default())
    }

    fn records(scores: &[f64]) -> Vec<AccountRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| AccountRecord::new(format!("C{}", i), Some(s)))
            .collect()
    }

    /// One score per SME group, repeated according to `counts`
    fn sme_population(counts: [usize; NUM_BINS]) -> Vec<AccountRecord> {
        let reps = [0.005, 0.010, 0.015, 0.020, 0.030, 0.035, 0.080];
        let scores: Vec<f64> = reps
            .iter()
            .zip(counts.iter())
            .flat_map(|(&s, &n)| std::iter::repeat(s).take(n))
            .collect();
        records(&scores)
    }

    fn single(report: PsiReport) -> PsiResult {
        match report {
            PsiReport::Single(r) => r,
            PsiReport::BySize(_) => panic!("expected a single result"),
        }
    }

    #[test]
    fn test_matching_distribution_has_zero_psi() {
        let policy = sme();
        let expected = policy.expected(None).unwrap();
        let counts: [usize; NUM_BINS] =
            std::array::from_fn(|i| (expected.as_array()[i] * 1_000_000.0).round() as usize);
        let result = psi_from_counts(&counts, expected);
        assert!(result.psi.abs() < 1e-8, "psi = {}", result.psi);
    }

    #[test]
    fn test_psi_formula() {
        let policy = sme();
        let counts = [10, 10, 20, 20, 20, 10, 10];
        let result = psi_from_counts(&counts, policy.expected(None).unwrap());

        let expected = policy.expected(None).unwrap();
        let manual: f64 = PdGroup::all()
            .map(|g| {
                let a = counts[g.index()] as f64 / 100.0;
                let e = expected.get(g);
                (a - e) * (a / e).ln()
            })
            .sum();
        assert_relative_eq!(result.psi, manual, epsilon = 1e-12);
        assert!(result.psi > 0.0);
        assert!(result.degenerate_bins.is_empty());
    }

    #[test]
    fn test_empty_group_contributes_zero() {
        let policy = sme();
        let result = single(calculate_psi(&sme_population([5, 5, 5, 5, 5, 5, 0]), &policy).unwrap());

        let g7 = &result.bins[6];
        assert_eq!(g7.total, 0);
        assert_eq!(g7.actual_pct, 0.0);
        assert_eq!(g7.log_ratio, 0.0);
        assert_eq!(g7.index, 0.0);
        assert_eq!(result.degenerate_bins, vec![PdGroup::new(7).unwrap()]);
        assert_eq!(result.bins.len(), NUM_BINS);
    }

    #[test]
    fn test_bin_totals_match_row_count() {
        let population = sme_population([3, 8, 21, 19, 14, 7, 5]);
        let result = single(calculate_psi(&population, &sme()).unwrap());
        assert_eq!(result.total(), population.len());
        let pct: f64 = result.bins.iter().map(|b| b.actual_pct).sum();
        assert_relative_eq!(pct, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_psi_is_repeatable() {
        let population = sme_population([3, 8, 21, 19, 14, 7, 5]);
        let first = calculate_psi(&population, &sme()).unwrap();
        let second = calculate_psi(&population, &sme()).unwrap();
        assert_eq!(first, second);
        match (first, second) {
            (PsiReport::Single(a), PsiReport::Single(b)) => {
                assert_eq!(a.psi.to_bits(), b.psi.to_bits())
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unscored_records_fall_in_highest_group() {
        let mut population = sme_population([1, 1, 1, 1, 1, 1, 1]);
        population.push(AccountRecord::new("X", None));
        population.push(AccountRecord::new("Y", Some(f64::NAN)));
        let result = single(calculate_psi(&population, &sme()).unwrap());
        assert_eq!(result.total(), population.len());
        assert_eq!(result.bins[6].total, 3);
    }

    #[test]
    fn test_empty_population_is_insufficient() {
        let err = calculate_psi(&[], &sme()).unwrap_err();
        assert!(matches!(err, MonitoringError::InsufficientData(_)));
    }

    #[test]
    fn test_wholesale_split_by_size() {
        let policy = BinningPolicy::resolve(Segment::Wholesale, WholesaleScheme::NumericCutoff);
        let mut population = records(&[0.005, 0.012, 0.05, 0.009]);
        population[0].size = Some(SizeClass::Large);
        population[1].size = Some(SizeClass::Large);
        population[2].size = Some(SizeClass::Medium);
        population[3].size = Some(SizeClass::Medium);

        match calculate_psi(&population, &policy).unwrap() {
            PsiReport::BySize(by_size) => {
                assert_eq!(by_size.len(), 2);
                assert_eq!(by_size[&SizeClass::Large].total(), 2);
                assert_eq!(by_size[&SizeClass::Medium].total(), 2);
                let large_expected = policy.expected(Some(SizeClass::Large)).unwrap();
                assert_eq!(by_size[&SizeClass::Large].bins[0].expected, large_expected.as_array()[0]);
            }
            PsiReport::Single(_) => panic!("wholesale should be split by size"),
        }
    }

    #[test]
    fn test_wholesale_without_size_is_configuration_error() {
        let policy = BinningPolicy::resolve(Segment::Wholesale, WholesaleScheme::NumericCutoff);
        let err = calculate_psi(&records(&[0.01]), &policy).unwrap_err();
        assert!(matches!(err, MonitoringError::Configuration(_)));
    }

    #[test]
    fn test_unknown_grade_is_invalid_value() {
        let policy = BinningPolicy::resolve(Segment::Wholesale, WholesaleScheme::CategoricalGrade);
        let mut record = AccountRecord::new("W1", None);
        record.grade = Some("Z".to_string());
        record.size = Some(SizeClass::Large);
        let err = calculate_psi(&[record], &policy).unwrap_err();
        assert!(matches!(err, MonitoringError::InvalidValue { .. }));
    }
}
