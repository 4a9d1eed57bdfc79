//! Probabilistic customer models.
//!
//! Models are implemented as small, pure functions over parameter structs so
//! that fitting and prediction code can stay generic.

pub mod bgnbd;
pub mod clv;
pub mod gamma_gamma;

pub use clv::*;
