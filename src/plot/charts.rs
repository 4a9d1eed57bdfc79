//! SVG charts rendered with Plotters.
//!
//! Three charts are written per run:
//! - `clv_distribution.svg`: CLV histogram with a KDE overlay
//! - `revenue_per_product.svg`: total revenue per product id
//! - `order_revenue_distribution.svg`: per-order revenue histogram with a KDE overlay

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::debug;

use crate::error::AppError;
use crate::math::{histogram, GaussianKde};

/// Pixel size of every chart.
pub const CHART_SIZE: (u32, u32) = (1000, 600);

const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);
const KDE_COLOR: RGBColor = RGBColor(200, 60, 40);

/// Files written by [`write_charts`].
#[derive(Debug, Clone)]
pub struct ChartPaths {
    pub clv_distribution: PathBuf,
    pub revenue_per_product: PathBuf,
    pub order_revenue_distribution: PathBuf,
}

impl ChartPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            clv_distribution: dir.join("clv_distribution.svg"),
            revenue_per_product: dir.join("revenue_per_product.svg"),
            order_revenue_distribution: dir.join("order_revenue_distribution.svg"),
        }
    }
}

/// Write the three run charts into `dir`.
pub fn write_charts(
    dir: &Path,
    clv: &[f64],
    revenue_per_product: &[(String, f64)],
    order_revenue: &[f64],
    bins: usize,
) -> Result<ChartPaths, AppError> {
    let paths = ChartPaths::in_dir(dir);

    histogram_chart(
        &paths.clv_distribution,
        clv,
        bins,
        "Customer Lifetime Value Distribution",
        "CLV",
    )?;
    bar_chart(
        &paths.revenue_per_product,
        revenue_per_product,
        "Revenue per Product",
        "Product ID",
        "Total Revenue",
    )?;
    histogram_chart(
        &paths.order_revenue_distribution,
        order_revenue,
        bins,
        "Revenue Distribution per Order",
        "Revenue",
    )?;

    debug!(dir = %dir.display(), "charts written");
    Ok(paths)
}

/// Histogram (equal-width bins) with a Gaussian KDE scaled to counts.
pub fn histogram_chart(path: &Path, values: &[f64], bins: usize, title: &str, x_desc: &str) -> Result<(), AppError> {
    let hist = histogram(values, bins)
        .ok_or_else(|| AppError::data(format!("No finite values to plot for '{title}'.")))?;
    let n_bins = hist.counts.len();
    let (x0, x1) = (hist.edges[0], hist.edges[n_bins]);
    let n: usize = hist.counts.iter().sum();

    let kde_curve: Vec<(f64, f64)> = GaussianKde::new(values)
        .map(|kde| {
            let scale = n as f64 * hist.bin_width();
            kde.curve(x0, x1, 200)
                .into_iter()
                .map(|(x, d)| (x, d * scale))
                .collect()
        })
        .unwrap_or_default();

    let y_top = kde_curve
        .iter()
        .map(|&(_, y)| y)
        .fold(hist.max_count() as f64, f64::max)
        .max(1.0)
        * 1.1;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, 0f64..y_top)
        .map_err(|e| chart_err(path, e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| chart_err(path, e))?;

    chart
        .draw_series(hist.counts.iter().enumerate().map(|(i, &count)| {
            Rectangle::new(
                [(hist.edges[i], 0.0), (hist.edges[i + 1], count as f64)],
                BAR_COLOR.mix(0.7).filled(),
            )
        }))
        .map_err(|e| chart_err(path, e))?;

    if kde_curve.len() >= 2 {
        chart
            .draw_series(LineSeries::new(kde_curve, KDE_COLOR.stroke_width(2)))
            .map_err(|e| chart_err(path, e))?;
    }

    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

/// Vertical bar chart with one bar per labelled value, in input order.
pub fn bar_chart(path: &Path, bars: &[(String, f64)], title: &str, x_desc: &str, y_desc: &str) -> Result<(), AppError> {
    if bars.is_empty() {
        return Err(AppError::data(format!("No values to plot for '{title}'.")));
    }
    let y_top = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max).max(1.0) * 1.1;
    let y_bottom = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::min);
    let n = bars.len();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_bottom..y_top)
        .map_err(|e| chart_err(path, e))?;

    // At most ~25 tick labels; dense product lists would overlap.
    let label_every = n.div_ceil(25).max(1);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 16))
        .x_labels(n.min(25))
        .x_label_formatter(&|v| {
            let i = v.round();
            if i < 0.0 || (v - i).abs() > 1e-6 {
                return String::new();
            }
            let i = i as usize;
            if i % label_every == 0 {
                bars.get(i).map(|(label, _)| label.clone()).unwrap_or_default()
            } else {
                String::new()
            }
        })
        .draw()
        .map_err(|e| chart_err(path, e))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *value)], BAR_COLOR.filled())
        }))
        .map_err(|e| chart_err(path, e))?;

    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

fn chart_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::input(format!("Failed to render chart '{}': {e}", path.display()))
}
