//! PD cut points, grade tables and expected distributions per segment
//!
//! Every account lands in exactly one of seven PD groups. Numeric bins are
//! closed at their upper edge: a score equal to a cut point belongs to the
//! lower group, and anything above the last cut point falls in group 7.

use super::{Segment, SizeClass, WholesaleScheme};
use crate::error::{MonitoringError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of PD groups
pub const NUM_BINS: usize = 7;

/// SME cut points, shared by the stability and performance views
const SME_CUTOFFS: [f64; NUM_BINS - 1] = [0.0089, 0.0126, 0.0174, 0.0233, 0.0312, 0.0410];

const WHOLESALE_STABILITY_CUTOFFS: [f64; NUM_BINS - 1] = [0.007, 0.010, 0.015, 0.022, 0.030, 0.040];
const WHOLESALE_PERFORMANCE_CUTOFFS: [f64; NUM_BINS - 1] =
    [0.007, 0.010, 0.014, 0.020, 0.028, 0.037];

const MORTGAGE_STABILITY_CUTOFFS: [f64; NUM_BINS - 1] = [0.005, 0.010, 0.015, 0.020, 0.030, 0.040];
const MORTGAGE_PERFORMANCE_CUTOFFS: [f64; NUM_BINS - 1] =
    [0.005, 0.009, 0.013, 0.018, 0.024, 0.031];

/// Development-sample distribution for the retail PD models (SME, Mortgage).
/// Published weights sum to 0.9999 and are normalised on use.
const RETAIL_EXPECTED: [f64; NUM_BINS] = [0.0666, 0.1169, 0.2512, 0.2397, 0.1793, 0.0826, 0.0636];

// Placeholder Wholesale calibration: replace with the bank's development-sample
// weights and rating master scale before production use.
const WHOLESALE_LARGE_EXPECTED: [f64; NUM_BINS] =
    [0.1215, 0.1873, 0.2246, 0.1907, 0.1322, 0.0868, 0.0569];
const WHOLESALE_MEDIUM_EXPECTED: [f64; NUM_BINS] =
    [0.0712, 0.1338, 0.2165, 0.2274, 0.1691, 0.1047, 0.0773];

const WHOLESALE_GRADE_LARGE_EXPECTED: [f64; NUM_BINS] =
    [0.1450, 0.2010, 0.2380, 0.1760, 0.1190, 0.0740, 0.0470];
const WHOLESALE_GRADE_MEDIUM_EXPECTED: [f64; NUM_BINS] =
    [0.0820, 0.1460, 0.2240, 0.2210, 0.1580, 0.0990, 0.0700];

/// Internal rating grade to PD group. Placeholder mapping, replace with the
/// bank's rating master scale.
const WHOLESALE_GRADES: &[(&str, u8)] = &[
    ("AAA", 1),
    ("AA+", 1),
    ("AA", 1),
    ("AA-", 1),
    ("A+", 2),
    ("A", 2),
    ("A-", 2),
    ("BBB+", 3),
    ("BBB", 3),
    ("BBB-", 3),
    ("BB+", 4),
    ("BB", 4),
    ("BB-", 5),
    ("B+", 5),
    ("B", 6),
    ("B-", 6),
    ("CCC", 7),
    ("CC", 7),
    ("C", 7),
    ("D", 7),
];

/// PD group label, 1 (lowest risk) through 7 (highest risk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PdGroup(u8);

impl PdGroup {
    /// Group 7, the riskiest
    pub const HIGHEST: PdGroup = PdGroup(NUM_BINS as u8);

    /// Create a group label, rejecting anything outside 1..=7
    pub fn new(label: u8) -> Option<Self> {
        (1..=NUM_BINS as u8).contains(&label).then_some(PdGroup(label))
    }

    pub fn label(&self) -> u8 {
        self.0
    }

    /// Zero-based position for array lookups
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// All groups in ascending order
    pub fn all() -> impl DoubleEndedIterator<Item = PdGroup> {
        (1..=NUM_BINS as u8).map(PdGroup)
    }

    fn from_index(index: usize) -> Self {
        PdGroup(index as u8 + 1)
    }
}

impl fmt::Display for PdGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The value an account is binned on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreValue<'a> {
    Pd(f64),
    Grade(&'a str),
}

/// How scores are assigned to PD groups
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    /// Ascending upper edges of groups 1 through 6
    Cutoffs([f64; NUM_BINS - 1]),
    /// Exact grade match
    Grades(&'static [(&'static str, u8)]),
}

impl Binning {
    /// Whether this binning reads the categorical grade instead of the PD score
    pub fn reads_grade(&self) -> bool {
        matches!(self, Binning::Grades(_))
    }

    /// Assign a PD group. Returns None for NaN scores, unknown grades, or a
    /// value of the wrong kind for this binning.
    pub fn bin_of(&self, value: ScoreValue<'_>) -> Option<PdGroup> {
        match (self, value) {
            (Binning::Cutoffs(cutoffs), ScoreValue::Pd(score)) => {
                if score.is_nan() {
                    return None;
                }
                let idx = cutoffs
                    .iter()
                    .position(|&edge| score <= edge)
                    .unwrap_or(NUM_BINS - 1);
                Some(PdGroup::from_index(idx))
            }
            (Binning::Grades(table), ScoreValue::Grade(grade)) => table
                .iter()
                .find(|(g, _)| *g == grade)
                .and_then(|&(_, label)| PdGroup::new(label)),
            _ => None,
        }
    }
}

/// Reference proportion per PD group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedDistribution([f64; NUM_BINS]);

impl ExpectedDistribution {
    /// Build from calibrated weights, rescaled to sum to one
    pub fn normalized(weights: [f64; NUM_BINS]) -> Self {
        let total: f64 = weights.iter().sum();
        let mut shares = weights;
        if total > 0.0 {
            for w in shares.iter_mut() {
                *w /= total;
            }
        }
        Self(shares)
    }

    pub fn get(&self, group: PdGroup) -> f64 {
        self.0[group.index()]
    }

    pub fn as_array(&self) -> &[f64; NUM_BINS] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expected {
    Single(ExpectedDistribution),
    BySize {
        large: ExpectedDistribution,
        medium: ExpectedDistribution,
    },
}

/// Binning rules for one segment, resolved once at the start of a run
#[derive(Debug, Clone, PartialEq)]
pub struct BinningPolicy {
    segment: Segment,
    stability: Binning,
    performance: Binning,
    expected: Expected,
}

impl BinningPolicy {
    /// Resolve the policy for a segment. The Wholesale scheme is ignored for
    /// the other segments.
    pub fn resolve(segment: Segment, scheme: WholesaleScheme) -> Self {
        match segment {
            Segment::Sme => Self {
                segment,
                stability: Binning::Cutoffs(SME_CUTOFFS),
                performance: Binning::Cutoffs(SME_CUTOFFS),
                expected: Expected::Single(ExpectedDistribution::normalized(RETAIL_EXPECTED)),
            },
            Segment::Mortgage => Self {
                segment,
                stability: Binning::Cutoffs(MORTGAGE_STABILITY_CUTOFFS),
                performance: Binning::Cutoffs(MORTGAGE_PERFORMANCE_CUTOFFS),
                expected: Expected::Single(ExpectedDistribution::normalized(RETAIL_EXPECTED)),
            },
            Segment::Wholesale => match scheme {
                WholesaleScheme::NumericCutoff => Self {
                    segment,
                    stability: Binning::Cutoffs(WHOLESALE_STABILITY_CUTOFFS),
                    performance: Binning::Cutoffs(WHOLESALE_PERFORMANCE_CUTOFFS),
                    expected: Expected::BySize {
                        large: ExpectedDistribution::normalized(WHOLESALE_LARGE_EXPECTED),
                        medium: ExpectedDistribution::normalized(WHOLESALE_MEDIUM_EXPECTED),
                    },
                },
                WholesaleScheme::CategoricalGrade => Self {
                    segment,
                    stability: Binning::Grades(WHOLESALE_GRADES),
                    performance: Binning::Grades(WHOLESALE_GRADES),
                    expected: Expected::BySize {
                        large: ExpectedDistribution::normalized(WHOLESALE_GRADE_LARGE_EXPECTED),
                        medium: ExpectedDistribution::normalized(WHOLESALE_GRADE_MEDIUM_EXPECTED),
                    },
                },
            },
        }
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Binning used for the stability index
    pub fn stability(&self) -> &Binning {
        &self.stability
    }

    /// Binning used for the discrimination metrics
    pub fn performance(&self) -> &Binning {
        &self.performance
    }

    /// Whether expected distributions are keyed by size class
    pub fn requires_size(&self) -> bool {
        matches!(self.expected, Expected::BySize { .. })
    }

    /// Expected distribution, selecting by size class where the segment needs one
    pub fn expected(&self, size: Option<SizeClass>) -> Result<&ExpectedDistribution> {
        match (&self.expected, size) {
            (Expected::Single(dist), _) => Ok(dist),
            (Expected::BySize { large, .. }, Some(SizeClass::Large)) => Ok(large),
            (Expected::BySize { medium, .. }, Some(SizeClass::Medium)) => Ok(medium),
            (Expected::BySize { .. }, None) => Err(MonitoringError::config(format!(
                "{} expected distribution requires a size class",
                self.segment
            ))),
        }
    }
}

/// Stability PD group of a numeric score under the default scheme
pub fn bin_of(score: f64, segment: Segment) -> Option<PdGroup> {
    BinningPolicy::resolve(segment, WholesaleScheme::default())
        .stability()
        .bin_of(ScoreValue::Pd(score))
}

/// Expected distribution for a segment under the default scheme
pub fn expected_distribution(
    segment: Segment,
    size: Option<SizeClass>,
) -> Result<[f64; NUM_BINS]> {
    let policy = BinningPolicy::resolve(segment, WholesaleScheme::default());
    policy.expected(size).map(|dist| *dist.as_array())
}
