//! Analysis configuration loaded from TOML.

use crate::analytics::{DEFAULT_BASE, DEFAULT_MIN_OVERLAP, DEFAULT_WINDOW};
use crate::periods::Period;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Options recognized by the analysis pipeline.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```toml
/// periods = ["1D", "MTD", "YTD", "1Y"]
/// rolling_window = 126
///
/// [benchmarks]
/// sector = "SPY"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rebasing anchor; defaults to the start of the requested range
    pub anchor_date: Option<NaiveDate>,
    /// Return-table as-of date; defaults to the latest date common to the basket
    pub as_of: Option<NaiveDate>,
    /// Periods shown in return tables
    pub periods: Vec<Period>,
    /// Rolling window in trading days
    pub rolling_window: usize,
    /// Minimum shared price dates for a correlation cell
    pub min_overlap: usize,
    /// Value assigned at the rebasing anchor
    pub rebase_base: f64,
    /// Benchmark overrides keyed by basket id
    pub benchmarks: BTreeMap<String, String>,
    /// Years shown in performance views
    pub performance_years: u32,
    /// Years shown in the risk and correlation view
    pub risk_years: u32,
    /// Years of history requested from the price source
    pub history_years: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anchor_date: None,
            as_of: None,
            periods: Period::DEFAULT_SET.to_vec(),
            rolling_window: DEFAULT_WINDOW,
            min_overlap: DEFAULT_MIN_OVERLAP,
            rebase_base: DEFAULT_BASE,
            benchmarks: BTreeMap::new(),
            performance_years: 1,
            risk_years: 3,
            history_years: 6,
        }
    }
}

impl AnalysisConfig {
    /// Get the default config file path.
    ///
    /// Default path: `<config dir>/factorboard/config.toml`
    /// Can be overridden with `FACTORBOARD_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FACTORBOARD_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("factorboard/config.toml"))
            .unwrap_or_else(|| PathBuf::from("factorboard.toml"))
    }

    /// Load from the default path, falling back to defaults if absent.
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.periods.is_empty() {
            return Err(Error::InvalidConfig("at least one period is required".to_string()));
        }
        if self.rolling_window < 2 {
            return Err(Error::InvalidConfig(format!(
                "rolling_window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        if self.min_overlap < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_overlap must be at least 2, got {}",
                self.min_overlap
            )));
        }
        if !self.rebase_base.is_finite() || self.rebase_base <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "rebase_base must be positive, got {}",
                self.rebase_base
            )));
        }
        if self.performance_years == 0 || self.risk_years == 0 {
            return Err(Error::InvalidConfig("display spans must be at least one year".to_string()));
        }
        if self.history_years < self.performance_years || self.history_years < self.risk_years {
            return Err(Error::InvalidConfig(
                "history_years must cover the performance and risk spans".to_string(),
            ));
        }
        Ok(())
    }

    /// Benchmark override for a basket, if configured.
    pub fn benchmark_for(&self, basket_id: &str) -> Option<&str> {
        self.benchmarks
            .get(&basket_id.to_lowercase())
            .map(String::as_str)
    }
}
