//! Descriptive statistics used by the reports and charts.

/// `describe()`-style summary of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator); NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summarize the finite values of `values`. Returns `None` if there are none.
pub fn describe(values: &[f64]) -> Option<Describe> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    } else {
        f64::NAN
    };

    Some(Describe {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation. `None` for fewer than two pairs or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0_f64;
    let mut vx = 0.0_f64;
    let mut vy = 0.0_f64;
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    let r = cov / (vx.sqrt() * vy.sqrt());
    r.is_finite().then_some(r)
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        if self.edges.len() < 2 {
            return 0.0;
        }
        self.edges[1] - self.edges[0]
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Bin finite values into `bins` equal-width buckets spanning `[min, max]`.
///
/// The last bucket is closed on the right. A constant sample gets a unit-wide range.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let bins = bins.max(1);
    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}

/// Gaussian kernel density estimate with Scott's bandwidth (`σ · n^(-1/5)`).
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// `None` for fewer than two finite values or a zero-variance sample.
    pub fn new(values: &[f64]) -> Option<Self> {
        let samples: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let stats = describe(&samples)?;
        if samples.len() < 2 || !(stats.std > 0.0) {
            return None;
        }
        let bandwidth = stats.std * (samples.len() as f64).powf(-0.2);
        Some(Self { samples, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.samples.len() as f64 * self.bandwidth * (2.0 * std::f64::consts::PI).sqrt());
        let sum: f64 = self
            .samples
            .iter()
            .map(|s| {
                let u = (x - s) / self.bandwidth;
                (-0.5 * u * u).exp()
            })
            .sum();
        sum * norm
    }

    /// Density on `points` evenly spaced values over `[lo, hi]`.
    pub fn curve(&self, lo: f64, hi: f64, points: usize) -> Vec<(f64, f64)> {
        let points = points.max(2);
        (0..points)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / (points - 1) as f64;
                (x, self.density(x))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn describe_matches_pandas_conventions() {
        let d = describe(&[1.0, 2.0, 3.0, 4.0, f64::NAN]).unwrap();
        assert_eq!(d.count, 4);
        assert_relative_eq!(d.mean, 2.5);
        assert_relative_eq!(d.std, (5.0_f64 / 3.0).sqrt());
        assert_relative_eq!(d.q25, 1.75);
        assert_relative_eq!(d.median, 2.5);
        assert_relative_eq!(d.q75, 3.25);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert!(describe(&[]).is_none());
        assert!(describe(&[7.0]).unwrap().std.is_nan());
    }

    #[test]
    fn pearson_detects_perfect_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert_relative_eq!(pearson(&x, &neg).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [0.0, 0.1, 0.5, 0.9, 1.0];
        let h = histogram(&values, 2).unwrap();
        assert_eq!(h.edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.counts.iter().sum::<usize>(), values.len());

        let flat = histogram(&[3.0, 3.0], 4).unwrap();
        assert_eq!(flat.counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn kde_integrates_to_about_one() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin() * 3.0).collect();
        let kde = GaussianKde::new(&values).unwrap();
        let curve = kde.curve(-15.0, 15.0, 3001);
        let dx = 30.0 / 3000.0;
        let area: f64 = curve.iter().map(|(_, d)| d * dx).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-3);
        assert!(GaussianKde::new(&[1.0, 1.0]).is_none());
    }
}
