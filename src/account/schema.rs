//! Column layout of account snapshots
//!
//! Performance snapshots carry a fixed-width prefix of columns into the
//! Max DPD tables. The prefix width and the position of every required column
//! are checked up front so a reshaped export fails instead of silently
//! shifting columns.

use crate::error::{MonitoringError, Result};
use crate::segment::{BinningPolicy, Segment};
use serde::{Deserialize, Serialize};

/// Canonical name of the delinquency join key
pub const ACCOUNT_KEY: &str = "zacno";

/// Width of the column prefix carried into performance tables
pub const DEFAULT_CARRIED_COLUMNS: usize = 19;

/// Which snapshot is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Current scored population, input to the stability index
    Distribution,
    /// Accounts joined against forward delinquency
    Performance,
}

/// Column names used to read account snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSchema {
    /// Customer identifier for SME and Mortgage
    pub customer_id: String,
    /// Customer identifier for Wholesale
    pub wholesale_customer_id: String,
    pub account_no: String,
    pub open_date: String,
    /// PD score in the distribution snapshot
    pub stability_score: String,
    /// PD score in the performance snapshot
    pub performance_score: String,
    pub grade: String,
    pub size: String,
    pub final_pd_date: String,
    pub carried_columns: usize,
}

impl Default for SnapshotSchema {
    fn default() -> Self {
        Self {
            customer_id: "CSNO (CIF-CORE)".to_string(),
            wholesale_customer_id: "CIF".to_string(),
            account_no: "ACNO".to_string(),
            open_date: "Open Date".to_string(),
            stability_score: "Final PD_2".to_string(),
            performance_score: "Final PD".to_string(),
            grade: "Grade".to_string(),
            size: "Size".to_string(),
            final_pd_date: "Date of Final PD".to_string(),
            carried_columns: DEFAULT_CARRIED_COLUMNS,
        }
    }
}

/// Resolved positions of the columns a snapshot read needs
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnIndex {
    pub customer_id: usize,
    pub account_no: Option<usize>,
    pub open_date: Option<usize>,
    pub score: Option<usize>,
    pub grade: Option<usize>,
    pub size: Option<usize>,
    pub final_pd_date: Option<usize>,
    /// Number of leading columns carried into output rows
    pub carried: usize,
}

impl SnapshotSchema {
    fn customer_column(&self, segment: Segment) -> &str {
        match segment {
            Segment::Wholesale => &self.wholesale_customer_id,
            _ => &self.customer_id,
        }
    }

    /// Locate the columns needed for `kind` in `headers`
    pub(crate) fn resolve(
        &self,
        headers: &[String],
        policy: &BinningPolicy,
        kind: SnapshotKind,
    ) -> Result<ColumnIndex> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                MonitoringError::config(format!("snapshot is missing required column '{}'", name))
            })
        };

        let binning = match kind {
            SnapshotKind::Distribution => policy.stability(),
            SnapshotKind::Performance => policy.performance(),
        };
        let score_column = match kind {
            SnapshotKind::Distribution => &self.stability_score,
            SnapshotKind::Performance => &self.performance_score,
        };

        let customer_id = require(self.customer_column(policy.segment()))?;
        let (score, grade) = if binning.reads_grade() {
            (find(score_column), Some(require(&self.grade)?))
        } else {
            (Some(require(score_column)?), find(&self.grade))
        };
        let final_pd_date = Some(require(&self.final_pd_date)?);
        let size = match kind {
            SnapshotKind::Distribution if policy.requires_size() => Some(require(&self.size)?),
            _ => find(&self.size),
        };

        let index = match kind {
            SnapshotKind::Distribution => ColumnIndex {
                customer_id,
                account_no: find(&self.account_no),
                open_date: find(&self.open_date),
                score,
                grade,
                size,
                final_pd_date,
                carried: 0,
            },
            SnapshotKind::Performance => {
                if headers.len() < self.carried_columns {
                    return Err(MonitoringError::config(format!(
                        "performance snapshot has {} columns, expected at least {}",
                        headers.len(),
                        self.carried_columns
                    )));
                }
                let index = ColumnIndex {
                    customer_id,
                    account_no: Some(require(&self.account_no)?),
                    open_date: Some(require(&self.open_date)?),
                    score,
                    grade,
                    size,
                    final_pd_date,
                    carried: self.carried_columns,
                };
                self.check_carried(headers, &index, binning.reads_grade())?;
                index
            }
        };

        Ok(index)
    }

    /// Every column the join and dedup rely on must survive the prefix cut
    fn check_carried(&self, headers: &[String], index: &ColumnIndex, grade: bool) -> Result<()> {
        let mut required = vec![
            Some(index.customer_id),
            index.account_no,
            index.open_date,
            index.final_pd_date,
        ];
        required.push(if grade { index.grade } else { index.score });

        for pos in required.into_iter().flatten() {
            if pos >= self.carried_columns {
                return Err(MonitoringError::config(format!(
                    "column '{}' is at position {}, outside the {} carried columns",
                    headers[pos].trim(),
                    pos + 1,
                    self.carried_columns
                )));
            }
        }
        Ok(())
    }
}
