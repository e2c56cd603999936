//! Run configuration
//!
//! Built-in defaults, optionally replaced by a JSON file, then adjusted by
//! environment variables. Command-line flags are applied last by the binary.

use crate::account::SnapshotSchema;
use crate::error::Result;
use crate::segment::WholesaleScheme;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_OUTPUT_DIR: &str = "MONITORING_OUTPUT_DIR";
pub const ENV_DPD_DIR: &str = "MONITORING_DPD_DIR";
pub const ENV_WHOLESALE_SCHEME: &str = "MONITORING_WHOLESALE_SCHEME";

/// Settings shared by every monitoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Snapshot column names
    pub schema: SnapshotSchema,

    /// Directory holding the monthly `search_dpd_<MMYY>.csv` files
    pub dpd_dir: PathBuf,

    /// Where reports are written
    pub output_dir: PathBuf,

    /// Binning scheme for Wholesale
    pub wholesale_scheme: WholesaleScheme,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            schema: SnapshotSchema::default(),
            dpd_dir: PathBuf::from("dpd"),
            output_dir: PathBuf::from("output"),
            wholesale_scheme: WholesaleScheme::default(),
        }
    }
}

impl MonitoringConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults or the given file, with environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_json_path(p)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = set(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = set(ENV_DPD_DIR) {
            self.dpd_dir = PathBuf::from(dir);
        }
        if let Some(scheme) = set(ENV_WHOLESALE_SCHEME) {
            self.wholesale_scheme = scheme.parse()?;
        }
        Ok(self)
    }
}
