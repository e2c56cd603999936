//! Monthly delinquency snapshots
//!
//! Each month is a `search_dpd_<MMYY>.csv` extract with an account number
//! (`zacno`) and days past due (`dpd`). A month that cannot be loaded is
//! treated as having no observations.

use super::YearMonth;
use crate::account::ACCOUNT_KEY;
use crate::error::{MonitoringError, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Column holding days past due
pub const DPD_COLUMN: &str = "dpd";

/// Raw row of a `search_dpd_<MMYY>.csv` extract
#[derive(Debug, Deserialize)]
struct DpdRow {
    #[serde(rename = "zacno")]
    account: Option<String>,
    dpd: Option<String>,
}

/// Days past due per account for one calendar month
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelinquencyTable {
    dpd: HashMap<String, u32>,
}

impl DelinquencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation. Repeated accounts keep their worst count.
    pub fn insert(&mut self, account_no: impl Into<String>, dpd: u32) {
        let entry = self.dpd.entry(account_no.into()).or_insert(dpd);
        *entry = (*entry).max(dpd);
    }

    pub fn get(&self, account_no: &str) -> Option<u32> {
        self.dpd.get(account_no).copied()
    }

    pub fn len(&self) -> usize {
        self.dpd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dpd.is_empty()
    }

    /// Read a month from CSV. Rows with a blank account or `dpd` are skipped,
    /// as are rows whose `dpd` is not a whole non-negative number.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = reader.headers()?;
        for name in [ACCOUNT_KEY, DPD_COLUMN] {
            if !headers.iter().any(|h| h == name) {
                return Err(MonitoringError::config(format!(
                    "delinquency file is missing column '{}'",
                    name
                )));
            }
        }

        let mut table = Self::new();
        let mut skipped = 0usize;
        for (i, result) in reader.deserialize().enumerate() {
            let row: DpdRow = result?;
            let (Some(account), Some(raw)) = (row.account, row.dpd) else {
                continue;
            };
            match parse_dpd(&raw) {
                Some(dpd) => table.insert(account, dpd),
                None => {
                    log::warn!(
                        "Skipping delinquency row {} for account {}: dpd '{}' is not a whole number of days",
                        i + 1,
                        account,
                        raw
                    );
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            log::warn!("{} delinquency rows skipped", skipped);
        }
        Ok(table)
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for DelinquencyTable {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (account, dpd) in iter {
            table.insert(account, dpd);
        }
        table
    }
}

/// Days past due may be exported as integers or whole floats ("30.0")
fn parse_dpd(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then(|| v as u32)
}

/// Where monthly delinquency tables come from
pub trait DelinquencySource {
    /// Load one month, or None if that month is unavailable
    fn load_month(&self, month: YearMonth) -> Option<DelinquencyTable>;
}

/// A directory of `search_dpd_<MMYY>.csv` files
#[derive(Debug, Clone)]
pub struct DpdDirectory {
    dir: PathBuf,
}

impl DpdDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File holding the given month
    pub fn file_for(&self, month: YearMonth) -> PathBuf {
        self.dir.join(format!("search_dpd_{}.csv", month.mmyy()))
    }
}

impl DelinquencySource for DpdDirectory {
    fn load_month(&self, month: YearMonth) -> Option<DelinquencyTable> {
        let path = self.file_for(month);
        if !path.is_file() {
            return None;
        }
        let loaded = std::fs::File::open(&path)
            .map_err(MonitoringError::from)
            .and_then(DelinquencyTable::from_reader);
        match loaded {
            Ok(table) => {
                log::info!("Loaded {} delinquency rows from {}", table.len(), path.display());
                Some(table)
            }
            Err(e) => {
                log::warn!("Could not read {}, treating month as empty: {}", path.display(), e);
                None
            }
        }
    }
}

impl DelinquencySource for HashMap<YearMonth, DelinquencyTable> {
    fn load_month(&self, month: YearMonth) -> Option<DelinquencyTable> {
        self.get(&month).cloned()
    }
}
