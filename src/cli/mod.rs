//! Command-line parsing for the CLV forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "clv", version, about = "Customer Lifetime Value forecaster (BG/NBD + Gamma-Gamma)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the CSVs, fit both models, print diagnostics, plot, and save the CLV summary.
    Run(RunArgs),
    /// Print the top customers by CLV only (useful for scripting).
    Rank(RunArgs),
    /// Plot a column of a previously saved CLV summary CSV in the terminal.
    Plot(PlotArgs),
    /// Write a synthetic customers/orders/products dataset.
    Sample(SampleArgs),
}

/// Common options for running and ranking.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Directory holding the input CSVs.
    #[arg(long, env = "CLV_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Customers file name (relative to the data directory).
    #[arg(long, default_value = "customers.csv")]
    pub customers: PathBuf,

    /// Orders file name (relative to the data directory).
    #[arg(long, default_value = "orders.csv")]
    pub orders: PathBuf,

    /// Products file name (relative to the data directory).
    #[arg(long, default_value = "products.csv")]
    pub products: PathBuf,

    /// Directory for `clv_summary.csv` and the charts.
    #[arg(long, env = "CLV_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// L2 penalizer for the BG/NBD fit.
    #[arg(long, default_value_t = 0.001)]
    pub bgnbd_penalizer: f64,

    /// L2 penalizer for the Gamma-Gamma fit.
    #[arg(long, default_value_t = 0.01)]
    pub gg_penalizer: f64,

    /// CLV horizon in months.
    #[arg(long, default_value_t = 12)]
    pub horizon: u32,

    /// Monthly discount rate.
    #[arg(long, default_value_t = 0.01)]
    pub discount_rate: f64,

    /// Histogram bins for charts and the terminal plot.
    #[arg(long, default_value_t = 50)]
    pub bins: usize,

    /// Show the top-N customers by CLV.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Rows shown in the RFM and summary samples.
    #[arg(long, default_value_t = 5)]
    pub head: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Do not write SVG charts.
    #[arg(long)]
    pub no_charts: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export fitted parameters and diagnostics to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

/// Options for plotting a saved CLV summary.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// CLV summary CSV produced by `clv run`.
    #[arg(long, value_name = "CSV", default_value = "clv_summary.csv")]
    pub summary: PathBuf,

    /// Column to plot (frequency, recency, T, monetary_value, clv, p_alive, expected_purchases).
    #[arg(long, default_value = "clv")]
    pub column: String,

    /// Histogram bins.
    #[arg(long, default_value_t = 50)]
    pub bins: usize,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output directory for the generated CSVs.
    #[arg(long, env = "CLV_DATA_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Number of customers.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub customers: usize,

    /// Number of products.
    #[arg(long, default_value_t = 40)]
    pub products: usize,

    /// Observation window in days.
    #[arg(long, default_value_t = 365)]
    pub days: u32,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_lifetimes_settings() {
        let cli = Cli::parse_from(["clv", "run", "--data-dir", "data"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.horizon, 12);
        assert_eq!(args.discount_rate, 0.01);
        assert_eq!(args.bgnbd_penalizer, 0.001);
        assert_eq!(args.gg_penalizer, 0.01);
        assert_eq!(args.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::parse_from(["clv", "rank", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Rank(_)));
    }
}
