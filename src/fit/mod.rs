//! Model fitting orchestration.
//!
//! Responsibilities:
//!
//! - build log-space start grids for each model
//! - screen and refine starts in parallel
//! - pick the best penalized likelihood and report diagnostics

pub mod fitter;
pub mod start_grid;

pub use fitter::*;
pub use start_grid::*;
