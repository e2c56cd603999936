//! Account records as read from a model snapshot

use crate::error::{MonitoringError, Result};
use crate::segment::{Binning, PdGroup, ScoreValue, SizeClass};
use chrono::{NaiveDate, NaiveDateTime};

/// Date layouts seen in snapshot exports
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a snapshot date cell. Returns None for blank or unrecognised values.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// A single account row from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    /// Customer identifier used for deduplication (CSNO, or CIF for Wholesale)
    pub customer_id: String,

    /// Account number, the delinquency join key
    pub account_no: Option<String>,

    /// Account open date
    pub open_date: Option<NaiveDate>,

    /// Final PD score
    pub pd_score: Option<f64>,

    /// Internal rating grade (categorical Wholesale scheme)
    pub grade: Option<String>,

    /// Obligor size class (Wholesale only)
    pub size: Option<SizeClass>,

    /// Date the final PD was assessed
    pub final_pd_date: Option<NaiveDate>,

    /// Raw values of the carried snapshot columns, in schema order
    pub carried: Vec<String>,
}

impl AccountRecord {
    /// Minimal record for a distribution snapshot
    pub fn new(customer_id: impl Into<String>, pd_score: Option<f64>) -> Self {
        Self {
            customer_id: customer_id.into(),
            account_no: None,
            open_date: None,
            pd_score,
            grade: None,
            size: None,
            final_pd_date: None,
            carried: Vec::new(),
        }
    }

    /// The value this record is binned on under the given binning
    pub fn score_for(&self, binning: &Binning) -> Option<ScoreValue<'_>> {
        if binning.reads_grade() {
            self.grade.as_deref().map(ScoreValue::Grade)
        } else {
            self.pd_score.filter(|s| !s.is_nan()).map(ScoreValue::Pd)
        }
    }

    /// PD group under the given binning. Unscored records yield None; a
    /// grade missing from the grade table is an error.
    pub fn pd_group(&self, binning: &Binning, row: usize) -> Result<Option<PdGroup>> {
        let Some(value) = self.score_for(binning) else {
            return Ok(None);
        };
        match (binning.bin_of(value), value) {
            (Some(group), _) => Ok(Some(group)),
            (None, ScoreValue::Grade(grade)) => Err(MonitoringError::InvalidValue {
                column: "Grade".to_string(),
                row,
                value: grade.to_string(),
            }),
            (None, ScoreValue::Pd(_)) => Ok(None),
        }
    }
}

/// A loaded snapshot: carried column names plus typed records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSnapshot {
    /// Names of the carried columns; the account number column is renamed to `zacno`
    pub columns: Vec<String>,
    pub records: Vec<AccountRecord>,
}

impl AccountSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
