//! Bayesian R_t inference.

pub mod credible;
pub mod grid;
pub mod posterior;

pub use credible::{credible_bounds, CredibleError};
pub use grid::{GridConfig, GridError, RGrid};
pub use posterior::{compute_posteriors, PosteriorError, PosteriorSet};
