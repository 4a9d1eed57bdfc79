//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the CLV pipeline
//! - prints reports/plots
//! - writes the CSV, charts and optional model JSON

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, PlotArgs, RunArgs, SampleArgs};
use crate::domain::{ClvSettings, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `clv` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` only supplies defaults; a missing file is fine.
    dotenvy::dotenv().ok();

    // We want `clv` and `clv --top 5` to behave like `clv run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args, OutputMode::Full),
        Command::Rank(args) => handle_run(args, OutputMode::RankOnly),
        Command::Plot(args) => handle_plot(args),
        Command::Sample(args) => handle_sample(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    RankOnly,
}

fn handle_run(args: RunArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;

    if mode == OutputMode::Full {
        println!("{}", crate::report::format_run_summary(&run, &config));
    }

    let top = crate::report::rank_by_clv(&run.clv, config.top_n);
    println!("{}", crate::report::format_rankings(&top));

    if mode == OutputMode::Full && config.plot {
        let clv: Vec<f64> = run.clv.iter().map(|r| r.clv).collect();
        let plot = crate::plot::render_ascii_histogram(
            &clv,
            "clv",
            &crate::plot::AsciiHistogram {
                bins: config.bins,
                width: config.plot_width,
                height: config.plot_height,
                kde: true,
            },
        );
        println!("{plot}");
    }

    if mode == OutputMode::Full {
        let saved = pipeline::write_outputs(&config, &run)?;
        if saved.charts.is_some() {
            println!("Charts saved to {}", config.output_dir.display());
        }
        if let Some(path) = &saved.model_json {
            println!("Model saved to {}", path.display());
        }
        println!("CLV summary saved to {}", saved.summary_csv.display());
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let records = crate::io::read_clv_summary(&args.summary)?;
    let values = crate::io::clv_column(&records, &args.column)?;

    let plot = crate::plot::render_ascii_histogram(
        &values,
        &args.column,
        &crate::plot::AsciiHistogram {
            bins: args.bins,
            width: args.width,
            height: args.height,
            kde: true,
        },
    );
    println!("{plot}");
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = crate::data::SampleConfig {
        customers: args.customers,
        products: args.products,
        days: args.days,
        seed: args.seed,
        ..crate::data::SampleConfig::default()
    };
    let files = crate::data::write_sample(&args.out_dir, &config)?;

    println!(
        "Wrote {} customers, {} order lines, {} products:",
        files.customers, files.order_lines, files.products
    );
    for path in [&files.customers_path, &files.orders_path, &files.products_path] {
        println!("  {}", path.display());
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        customers_path: args.data_dir.join(&args.customers),
        orders_path: args.data_dir.join(&args.orders),
        products_path: args.data_dir.join(&args.products),
        output_dir: args.output_dir.clone(),
        bgnbd_penalizer: args.bgnbd_penalizer,
        gamma_gamma_penalizer: args.gg_penalizer,
        clv: ClvSettings {
            horizon_months: args.horizon,
            discount_rate: args.discount_rate,
        },
        bins: args.bins,
        top_n: args.top,
        sample_rows: args.head,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        charts: !args.no_charts,
        export_model: args.export_model.clone(),
    }
}

/// Logs go to stderr so stdout stays clean for reports.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects info and `-vv` debug.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Rewrite argv so `clv` defaults to `clv run`.
///
/// Rules:
/// - `clv`                      -> `clv run`
/// - `clv --top 5 ...`          -> `clv run --top 5 ...`
/// - `clv --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "rank" | "plot" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_the_pipeline() {
        assert_eq!(rewrite_args(args(&["clv"])), args(&["clv", "run"]));
        assert_eq!(
            rewrite_args(args(&["clv", "--top", "5"])),
            args(&["clv", "run", "--top", "5"])
        );
        assert_eq!(rewrite_args(args(&["clv", "--help"])), args(&["clv", "--help"]));
        assert_eq!(rewrite_args(args(&["clv", "plot"])), args(&["clv", "plot"]));
    }

    #[test]
    fn run_config_joins_file_names_onto_data_dir() {
        let cli = Cli::parse_from(["clv", "run", "--data-dir", "in", "--output-dir", "out", "--no-charts"]);
        let Command::Run(run_args) = cli.command else {
            panic!("expected run");
        };
        let config = run_config_from_args(&run_args);
        assert_eq!(config.orders_path, std::path::PathBuf::from("in/orders.csv"));
        assert_eq!(config.summary_csv_path(), std::path::PathBuf::from("out/clv_summary.csv"));
        assert!(!config.charts);
        assert!(config.plot);
        assert_eq!(config.clv, ClvSettings::default());
    }
}
