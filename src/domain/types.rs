//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while aggregating and fitting
//! - exported to CSV/JSON
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// `(rows, columns)` of a loaded table, as printed in the run header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

impl std::fmt::Display for TableShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.rows, self.columns)
    }
}

/// A customer master-data row. Only the id is interpreted.
#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub customer_id: String,
}

/// A raw order line as read from `orders.csv`.
///
/// `price` is the first price-like column of the orders file (if any), and
/// `revenue` is only populated when the file carries a `revenue` column.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub line: usize,
    pub customer_id: String,
    pub order_id: String,
    pub order_date: NaiveDateTime,
    pub product_id: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub revenue: Option<f64>,
}

/// A product row as read from `products.csv`.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub line: usize,
    pub product_id: String,
    pub price: Option<f64>,
    pub revenue: Option<f64>,
}

/// An order line after the product join, with resolved revenue.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub customer_id: String,
    pub order_id: String,
    pub order_date: NaiveDateTime,
    pub product_id: String,
    pub revenue: f64,
}

/// How the per-order revenue was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevenueSource {
    /// A `revenue` column was present and used as-is.
    Column,
    /// `quantity × <price_column>`.
    Derived { price_column: String },
}

/// Per-customer recency / frequency / monetary summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Whole days between the snapshot and the latest order.
    pub recency: i64,
    /// Number of order rows.
    pub frequency: usize,
    /// Total revenue.
    pub monetary: f64,
}

/// Per-customer input to the BG/NBD and Gamma-Gamma models.
///
/// All durations are in days.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSummary {
    pub customer_id: String,
    /// Number of repeat purchase days.
    pub frequency: u32,
    /// Days between the first and the last purchase day.
    pub recency: f64,
    /// Days between the first purchase day and the end of observation.
    pub t: f64,
    /// Mean revenue per repeat purchase day (0 for one-time buyers).
    pub monetary_value: f64,
}

/// One output row of `clv_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClvRecord {
    pub customer_id: String,
    pub frequency: u32,
    pub recency: f64,
    #[serde(rename = "T")]
    pub t: f64,
    pub monetary_value: f64,
    pub clv: f64,
    pub p_alive: f64,
    pub expected_purchases: f64,
}

/// Fitted BG/NBD parameters (time unit: days).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BgNbdParams {
    pub r: f64,
    pub alpha: f64,
    pub a: f64,
    pub b: f64,
}

/// Fitted Gamma-Gamma parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaGammaParams {
    pub p: f64,
    pub q: f64,
    pub v: f64,
}

/// Optimizer diagnostics for one fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Penalized objective at the optimum (mean negative log-likelihood + penalty).
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Number of customers that entered the likelihood.
    pub n_customers: usize,
    /// Index of the winning start point in the multi-start grid.
    pub start_index: usize,
}

/// CLV horizon and discounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClvSettings {
    /// Forward horizon in months.
    pub horizon_months: u32,
    /// Monthly discount rate.
    pub discount_rate: f64,
}

impl Default for ClvSettings {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            discount_rate: 0.01,
        }
    }
}

/// A saved model file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub snapshot_date: NaiveDate,
    pub clv: ClvSettings,
    pub bgnbd: BgNbdParams,
    pub bgnbd_penalizer: f64,
    pub bgnbd_fit: FitDiagnostics,
    pub gamma_gamma: GammaGammaParams,
    pub gamma_gamma_penalizer: f64,
    pub gamma_gamma_fit: FitDiagnostics,
    /// Pearson correlation of frequency and monetary value among repeat customers.
    pub frequency_monetary_corr: Option<f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub customers_path: PathBuf,
    pub orders_path: PathBuf,
    pub products_path: PathBuf,
    pub output_dir: PathBuf,

    pub bgnbd_penalizer: f64,
    pub gamma_gamma_penalizer: f64,
    pub clv: ClvSettings,

    /// Histogram bins for the charts and the terminal plot.
    pub bins: usize,
    pub top_n: usize,
    /// Rows shown in the RFM / summary samples.
    pub sample_rows: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Write SVG charts into `output_dir`.
    pub charts: bool,

    pub export_model: Option<PathBuf>,
}

impl RunConfig {
    pub fn summary_csv_path(&self) -> PathBuf {
        self.output_dir.join("clv_summary.csv")
    }
}
