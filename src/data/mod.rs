//! Data preparation beyond raw CSV parsing.
//!
//! - product join + revenue resolution (`enrich`)
//! - synthetic dataset generation (`sample`)

pub mod enrich;
pub mod sample;

pub use enrich::*;
pub use sample::*;
