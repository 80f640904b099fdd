//! R_t Inference Core Library
//!
//! Estimates the time-varying effective reproduction number R_t of an
//! infectious disease from noisy daily observation series:
//! - Signal conditioning (outlier replacement, Gaussian smoothing)
//! - Sequential Bayesian filtering over a discretized R grid
//! - Credible-interval extraction and cross-series lag alignment
//! - Per-geography orchestration and result-table composition
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod engine;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod output;
pub mod series;
pub mod signal;

pub use config::{load_config, ConfigError, RtConfig};
pub use engine::{EngineError, GeographyOutcome, RtEngine};
pub use output::ResultTable;
pub use series::{GeographyInput, ObservationSeries, TimeseriesKind};
