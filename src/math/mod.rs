//! Mathematical utilities: special functions, simplex optimizer, descriptive stats.

pub mod nelder_mead;
pub mod special;
pub mod stats;

pub use nelder_mead::*;
pub use special::*;
pub use stats::*;
