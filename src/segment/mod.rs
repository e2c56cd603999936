//! Portfolio segments and their binning policies

mod binning;

pub use binning::{
    bin_of, expected_distribution, Binning, BinningPolicy, ExpectedDistribution, PdGroup,
    ScoreValue, NUM_BINS,
};

use crate::error::{MonitoringError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portfolio segment a PD model is calibrated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "SME")]
    Sme,
    Wholesale,
    Mortgage,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Sme, Segment::Wholesale, Segment::Mortgage];

    /// Display name as used in report titles
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Sme => "SME",
            Segment::Wholesale => "Wholesale",
            Segment::Mortgage => "Mortgage",
        }
    }

    /// Lower-case stem used when naming output files
    pub fn file_stem(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Wholesale expected distributions are split by obligor size
    pub fn is_size_split(&self) -> bool {
        matches!(self, Segment::Wholesale)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sme" => Ok(Segment::Sme),
            "wholesale" => Ok(Segment::Wholesale),
            "mortgage" => Ok(Segment::Mortgage),
            _ => Err(MonitoringError::config(format!(
                "unrecognized segment '{}' (expected SME, Wholesale or Mortgage)",
                s
            ))),
        }
    }
}

/// Wholesale obligor size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeClass {
    Large,
    Medium,
}

impl SizeClass {
    pub const ALL: [SizeClass; 2] = [SizeClass::Large, SizeClass::Medium];

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Large => "Large",
            SizeClass::Medium => "Medium",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeClass {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "large" => Ok(SizeClass::Large),
            "medium" => Ok(SizeClass::Medium),
            _ => Err(MonitoringError::config(format!(
                "unrecognized size class '{}' (expected Large or Medium)",
                s
            ))),
        }
    }
}

/// The two Wholesale binning schemes in use.
///
/// They carry different expected distributions and are never mixed within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WholesaleScheme {
    /// PD score compared against ascending cut points
    #[default]
    NumericCutoff,
    /// Internal rating grade mapped to a bin by exact match
    CategoricalGrade,
}

impl FromStr for WholesaleScheme {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "numeric-cutoff" => Ok(WholesaleScheme::NumericCutoff),
            "grade" | "categorical" | "categorical-grade" => Ok(WholesaleScheme::CategoricalGrade),
            _ => Err(MonitoringError::config(format!(
                "unrecognized wholesale scheme '{}' (expected numeric-cutoff or categorical-grade)",
                s
            ))),
        }
    }
}
