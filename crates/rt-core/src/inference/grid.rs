//! Discrete grid of candidate R_t values.
//!
//! Every posterior in a run is a mass function over this grid. The grid is
//! built once per engine and shared across observation kinds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the R grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_r_min")]
    pub r_min: f64,

    #[serde(default = "default_r_max")]
    pub r_max: f64,

    /// Number of grid points, endpoints included.
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_r_min() -> f64 {
    0.0
}

fn default_r_max() -> f64 {
    10.0
}

fn default_steps() -> usize {
    501
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            r_min: default_r_min(),
            r_max: default_r_max(),
            steps: default_steps(),
        }
    }
}

/// Errors from grid configuration.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid grid bounds: [{r_min}, {r_max}]")]
    InvalidBounds { r_min: f64, r_max: f64 },

    #[error("invalid step count: {0} (must be >= 2)")]
    InvalidSteps(usize),
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.r_min.is_finite() || !self.r_max.is_finite() || self.r_min >= self.r_max {
            return Err(GridError::InvalidBounds {
                r_min: self.r_min,
                r_max: self.r_max,
            });
        }
        if self.steps < 2 {
            return Err(GridError::InvalidSteps(self.steps));
        }
        Ok(())
    }
}

/// A strictly increasing grid of candidate R_t values.
#[derive(Debug, Clone, PartialEq)]
pub struct RGrid {
    values: Vec<f64>,
}

impl RGrid {
    /// Evenly spaced grid over the configured bounds, endpoints included.
    pub fn from_config(config: &GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        let step = (config.r_max - config.r_min) / (config.steps - 1) as f64;
        let values = (0..config.steps)
            .map(|i| config.r_min + step * i as f64)
            .collect();
        Ok(RGrid { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Grid spacing (the resolution of every estimate derived from it).
    pub fn resolution(&self) -> f64 {
        self.values[1] - self.values[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_shape() {
        let grid = RGrid::from_config(&GridConfig::default()).unwrap();
        assert_eq!(grid.len(), 501);
        assert_eq!(grid.value_at(0), 0.0);
        assert_eq!(grid.value_at(500), 10.0);
        assert!((grid.resolution() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn grid_is_strictly_increasing() {
        let grid = RGrid::from_config(&GridConfig::default()).unwrap();
        for pair in grid.values().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn rejects_invalid_bounds() {
        let config = GridConfig {
            r_min: 5.0,
            r_max: 5.0,
            steps: 10,
        };
        assert!(matches!(
            RGrid::from_config(&config),
            Err(GridError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn rejects_single_step() {
        let config = GridConfig {
            steps: 1,
            ..Default::default()
        };
        assert!(matches!(
            RGrid::from_config(&config),
            Err(GridError::InvalidSteps(1))
        ));
    }
}
