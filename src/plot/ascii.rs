//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - histogram bars: `#`
//! - optional KDE curve (scaled to counts): `-` line

use crate::math::{histogram, GaussianKde};

/// Terminal histogram settings.
#[derive(Debug, Clone, Copy)]
pub struct AsciiHistogram {
    pub bins: usize,
    pub width: usize,
    pub height: usize,
    pub kde: bool,
}

/// Render a histogram of `values` labelled `label`.
pub fn render_ascii_histogram(values: &[f64], label: &str, opts: &AsciiHistogram) -> String {
    let width = opts.width.max(10);
    let height = opts.height.max(3);

    let Some(hist) = histogram(values, opts.bins) else {
        return format!("Plot: {label}: no finite values\n");
    };
    let bins = hist.counts.len();
    let max_count = hist.max_count().max(1) as f64;
    let lo = hist.edges[0];
    let hi = hist.edges[bins];
    let n: usize = hist.counts.iter().sum();

    let mut grid = vec![vec![' '; width]; height];

    // Bars first; each column shows the bin its center falls into.
    for x in 0..width {
        let bin = (x * bins / width).min(bins - 1);
        let count = hist.counts[bin];
        if count == 0 {
            continue;
        }
        let filled = ((count as f64 / max_count * height as f64).round() as usize).clamp(1, height);
        for row in grid.iter_mut().skip(height - filled) {
            row[x] = '#';
        }
    }

    if opts.kde {
        if let Some(kde) = GaussianKde::new(values) {
            let scale = n as f64 * hist.bin_width();
            let curve: Vec<(f64, f64)> = kde
                .curve(lo, hi, width)
                .into_iter()
                .map(|(x, d)| (x, d * scale))
                .collect();
            draw_curve(&mut grid, &curve, lo, hi, 0.0, max_count);
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {label}=[{lo:.2}, {hi:.2}] | count=[0, {}] | n={n}\n",
        hist.max_count()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 || grid.is_empty() {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish). Only blank cells are overwritten.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_golden_snapshot_small() {
        let opts = AsciiHistogram {
            bins: 2,
            width: 10,
            height: 3,
            kde: false,
        };
        let txt = render_ascii_histogram(&[0.0, 0.0, 0.0, 1.0], "clv", &opts);
        let expected = concat!(
            "Plot: clv=[0.00, 1.00] | count=[0, 3] | n=4\n",
            "#####     \n",
            "#####     \n",
            "##########\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn kde_overlay_only_fills_blank_cells() {
        let values: Vec<f64> = (0..200).map(|i| (i % 20) as f64).collect();
        let opts = AsciiHistogram {
            bins: 10,
            width: 40,
            height: 8,
            kde: true,
        };
        let txt = render_ascii_histogram(&values, "x", &opts);
        let body: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(body.len(), 8);
        assert!(body.iter().all(|l| l.chars().count() == 40));
        // Uniform data: every column has a bar on the bottom row.
        assert!(body[7].chars().all(|c| c == '#'));
    }

    #[test]
    fn empty_input_renders_a_notice() {
        let opts = AsciiHistogram {
            bins: 5,
            width: 20,
            height: 5,
            kde: true,
        };
        assert_eq!(
            render_ascii_histogram(&[f64::NAN], "clv", &opts),
            "Plot: clv: no finite values\n"
        );
    }
}
