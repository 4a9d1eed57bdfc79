//! Shared CLV pipeline used by the `run` and `rank` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> enrich -> aggregate -> fit -> predict
//!
//! The commands can then focus on presentation (full report vs ranking only).

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::info;

use crate::aggregate::{compute_rfm, revenue_by_product, snapshot_date, summarize_transactions};
use crate::data::enrich_orders;
use crate::domain::{ClvRecord, CustomerSummary, ModelFile, RevenueSource, RfmRecord, RunConfig, TableShape};
use crate::error::AppError;
use crate::fit::{fit_bgnbd, fit_gamma_gamma, BgNbdFit, FitOptions, GammaGammaFit};
use crate::io::{load_customers, load_orders, load_products, write_clv_summary_csv, write_model_json, RowError};
use crate::models::predict_clv;
use crate::plot::{write_charts, ChartPaths};

/// Shapes of the three input tables.
#[derive(Debug, Clone, Copy)]
pub struct InputShapes {
    pub customers: TableShape,
    pub orders: TableShape,
    pub products: TableShape,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub shapes: InputShapes,
    pub revenue_source: RevenueSource,
    /// Row-level problems from ingest and enrichment, in file order.
    pub row_errors: Vec<RowError>,
    pub snapshot: NaiveDateTime,
    pub rfm: Vec<RfmRecord>,
    pub summary: Vec<CustomerSummary>,
    pub bgnbd: BgNbdFit,
    pub gamma_gamma: GammaGammaFit,
    pub clv: Vec<ClvRecord>,
    pub revenue_per_product: Vec<(String, f64)>,
    /// Revenue of every resolved order line.
    pub order_revenue: Vec<f64>,
}

/// Files written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct SavedOutputs {
    pub summary_csv: PathBuf,
    pub charts: Option<ChartPaths>,
    pub model_json: Option<PathBuf>,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Load the three inputs.
    let customers = load_customers(&config.customers_path)?;
    let orders = load_orders(&config.orders_path)?;
    let products = load_products(&config.products_path)?;
    info!(
        customers = %customers.shape,
        orders = %orders.shape,
        products = %products.shape,
        "inputs loaded"
    );

    // 2) Join products and resolve revenue.
    let enriched = enrich_orders(&orders, &products)?;

    let mut row_errors = Vec::new();
    row_errors.extend(customers.row_errors.iter().cloned());
    row_errors.extend(orders.row_errors.iter().cloned());
    row_errors.extend(products.row_errors.iter().cloned());
    row_errors.extend(enriched.row_errors.iter().cloned());

    // 3) Aggregate.
    let snapshot = snapshot_date(&enriched.transactions)?;
    let rfm = compute_rfm(&enriched.transactions, snapshot);
    let summary = summarize_transactions(&enriched.transactions, snapshot);
    info!(snapshot = %snapshot, customers = summary.len(), "aggregated");

    // 4) Fit both models.
    let bgnbd = fit_bgnbd(&summary, &FitOptions::with_penalizer(config.bgnbd_penalizer))?;
    let gamma_gamma = fit_gamma_gamma(&summary, &FitOptions::with_penalizer(config.gamma_gamma_penalizer))?;

    // 5) Predict.
    let clv = predict_clv(&bgnbd.params, &gamma_gamma.params, &summary, &config.clv)?;

    let revenue_per_product = revenue_by_product(&enriched.transactions);
    let order_revenue = enriched.transactions.iter().map(|t| t.revenue).collect();

    Ok(RunOutput {
        shapes: InputShapes {
            customers: customers.shape,
            orders: orders.shape,
            products: products.shape,
        },
        revenue_source: enriched.revenue_source,
        row_errors,
        snapshot,
        rfm,
        summary,
        bgnbd,
        gamma_gamma,
        clv,
        revenue_per_product,
        order_revenue,
    })
}

/// Write the CLV summary CSV plus the optional charts and model JSON.
pub fn write_outputs(config: &RunConfig, run: &RunOutput) -> Result<SavedOutputs, AppError> {
    fs::create_dir_all(&config.output_dir).map_err(|e| {
        AppError::input(format!(
            "Failed to create output directory '{}': {e}",
            config.output_dir.display()
        ))
    })?;

    let summary_csv = config.summary_csv_path();
    write_clv_summary_csv(&summary_csv, &run.clv)?;

    let charts = if config.charts {
        let clv: Vec<f64> = run.clv.iter().map(|r| r.clv).collect();
        Some(write_charts(
            &config.output_dir,
            &clv,
            &run.revenue_per_product,
            &run.order_revenue,
            config.bins,
        )?)
    } else {
        None
    };

    let model_json = match &config.export_model {
        Some(path) => {
            write_model_json(path, &model_file(config, run))?;
            Some(path.clone())
        }
        None => None,
    };

    Ok(SavedOutputs {
        summary_csv,
        charts,
        model_json,
    })
}

/// The portable model description of a run.
pub fn model_file(config: &RunConfig, run: &RunOutput) -> ModelFile {
    ModelFile {
        tool: "clv".to_string(),
        snapshot_date: run.snapshot.date(),
        clv: config.clv,
        bgnbd: run.bgnbd.params,
        bgnbd_penalizer: config.bgnbd_penalizer,
        bgnbd_fit: run.bgnbd.diagnostics.clone(),
        gamma_gamma: run.gamma_gamma.params,
        gamma_gamma_penalizer: config.gamma_gamma_penalizer,
        gamma_gamma_fit: run.gamma_gamma.diagnostics.clone(),
        frequency_monetary_corr: run.gamma_gamma.frequency_monetary_corr,
    }
}
