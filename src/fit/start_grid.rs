//! Starting-point grids for the likelihood optimizers.
//!
//! We fit parameters in log space from a deterministic grid of starts:
//! - the grid is screened with one objective evaluation per start (parallel)
//! - only the most promising starts are refined with Nelder–Mead
//!
//! This keeps fits reproducible while guarding against poor local optima.

use nalgebra::DVector;

use crate::error::AppError;

/// Cartesian grid of log-space starting points.
///
/// `values` are natural-scale parameter values; `default_log` is a log-space
/// coordinate. The all-`default_log` point is always first so the grid contains
/// the plain single-start fit as a candidate.
pub fn log_start_grid(dim: usize, values: &[f64], default_log: f64) -> Result<Vec<DVector<f64>>, AppError> {
    if dim == 0 {
        return Err(AppError::input("Start grid dimension must be >= 1."));
    }
    if !default_log.is_finite() {
        return Err(AppError::input(format!(
            "Invalid default log-space start {default_log} (must be finite)."
        )));
    }
    if let Some(bad) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        return Err(AppError::input(format!(
            "Invalid start value {bad} (must be finite and > 0)."
        )));
    }

    let mut out = vec![DVector::from_element(dim, default_log)];
    let mut idx = vec![0usize; dim];
    if values.is_empty() {
        return Ok(out);
    }

    loop {
        let point = DVector::from_iterator(dim, idx.iter().map(|&i| values[i].ln()));
        if point != out[0] {
            out.push(point);
        }

        // Odometer increment over `values.len()` digits.
        let mut pos = 0;
        loop {
            idx[pos] += 1;
            if idx[pos] < values.len() {
                break;
            }
            idx[pos] = 0;
            pos += 1;
            if pos == dim {
                return Ok(out);
            }
        }
    }
}
