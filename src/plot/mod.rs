//! Plotting: terminal histograms (`ascii`) and SVG charts (`charts`).

pub mod ascii;
pub mod charts;

pub use ascii::*;
pub use charts::*;
