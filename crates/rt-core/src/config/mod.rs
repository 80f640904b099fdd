//! Engine configuration loading and validation.
//!
//! All knobs live in one serde-backed struct with per-field defaults, so a
//! config file only needs to name what it overrides. Resolution order is
//! CLI flag → file → defaults.

use crate::inference::grid::{GridConfig, GridError};
use crate::signal::align::{AlignmentConfig, AlignmentError};
use crate::signal::outliers::{OutlierConfig, OutlierError};
use crate::signal::smoothing::{SmoothingConfig, SmoothingError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Outliers(#[from] OutlierError),

    #[error(transparent)]
    Smoothing(#[from] SmoothingError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("invalid process sigma: {0} (must be > 0)")]
    InvalidProcessSigma(f64),

    #[error("invalid confidence level: {0} (must be in (0, 1))")]
    InvalidConfidenceLevel(f64),

    #[error("no confidence levels configured")]
    NoConfidenceLevels,

    #[error("invalid activity threshold: {name} = {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Full configuration surface for one inference run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtConfig {
    pub r_grid: GridConfig,

    /// Std of the day-to-day random walk on R_t. Larger values allow faster
    /// swings; smaller values smooth the trajectory.
    pub process_sigma: f64,

    pub smoothing: SmoothingConfig,
    pub outliers: OutlierConfig,
    pub alignment: AlignmentConfig,

    /// Credible-interval levels, each in (0, 1).
    pub confidence_levels: Vec<f64>,

    /// Minimum total cases for case-based inference to run at all.
    pub min_cases: f64,

    /// Minimum total deaths for death-based inference.
    pub min_deaths: f64,

    /// Day-0 epoch for the day-index column in output records.
    pub ref_date: NaiveDate,
}

impl Default for RtConfig {
    fn default() -> Self {
        Self {
            r_grid: GridConfig::default(),
            process_sigma: 0.05,
            smoothing: SmoothingConfig::default(),
            outliers: OutlierConfig::default(),
            alignment: AlignmentConfig::default(),
            confidence_levels: vec![0.68, 0.95],
            min_cases: 5.0,
            min_deaths: 5.0,
            ref_date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid epoch"),
        }
    }
}

impl RtConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.r_grid.validate()?;
        self.smoothing.validate()?;
        self.outliers.validate()?;
        self.alignment.validate()?;
        if !(self.process_sigma > 0.0) || !self.process_sigma.is_finite() {
            return Err(ConfigError::InvalidProcessSigma(self.process_sigma));
        }
        if self.confidence_levels.is_empty() {
            return Err(ConfigError::NoConfidenceLevels);
        }
        for &level in &self.confidence_levels {
            if !(level > 0.0 && level < 1.0) {
                return Err(ConfigError::InvalidConfidenceLevel(level));
            }
        }
        if !(self.min_cases >= 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "min_cases",
                value: self.min_cases,
            });
        }
        if !(self.min_deaths >= 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "min_deaths",
                value: self.min_deaths,
            });
        }
        Ok(())
    }
}

/// Load configuration from an optional JSON file, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<RtConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let config: RtConfig =
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            info!(path = %path.display(), "loaded config file");
            config
        }
        None => RtConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
