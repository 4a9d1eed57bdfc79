//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw input rows (`OrderRow`, `ProductRow`, `CustomerRow`)
//! - joined transactions and per-customer aggregates (`Transaction`, `RfmRecord`, `CustomerSummary`)
//! - model parameters and outputs (`BgNbdParams`, `GammaGammaParams`, `ClvRecord`, `ModelFile`)

pub mod types;

pub use types::*;
