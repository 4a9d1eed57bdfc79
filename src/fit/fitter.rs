//! Maximum-likelihood fitting for the BG/NBD and Gamma-Gamma models.
//!
//! Given the per-customer summary we:
//! - compress identical customers into weighted rows
//! - screen a log-space start grid (parallel, one evaluation per start)
//! - refine the best few starts with Nelder–Mead (parallel)
//! - pick the lowest penalized objective; ties go to the lower start index
//!
//! Parameters are optimized as logarithms so every trial point is positive,
//! and the penalty `penalizer · Σ exp(θ)²` is applied to the exponentiated
//! coordinates. Gamma-Gamma uses `q = 1 + exp(θ_q)` so the population mean
//! spend stays finite.

use std::collections::BTreeMap;

use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BgNbdParams, CustomerSummary, FitDiagnostics, GammaGammaParams};
use crate::error::AppError;
use crate::fit::start_grid::log_start_grid;
use crate::math::{minimize, pearson, Minimum, NelderMeadOptions};
use crate::models::bgnbd;
use crate::models::gamma_gamma;

/// Log-space start used by lifetimes for every coordinate of both models.
const DEFAULT_LOG_START: f64 = 0.1;
const BGNBD_GRID: [f64; 3] = [0.1, 0.5, 2.0];
const GAMMA_GAMMA_GRID: [f64; 3] = [0.5, 2.0, 10.0];
/// BG/NBD time axis is rescaled so the oldest customer has `T = 10`.
const TIME_SCALE_TARGET: f64 = 10.0;
/// Correlation above which the Gamma-Gamma independence assumption is suspect.
const CORRELATION_WARN: f64 = 0.3;

/// Fitting options for one model.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub penalizer: f64,
    /// How many screened starts are refined with Nelder–Mead.
    pub refine_top: usize,
    pub nelder_mead: NelderMeadOptions,
}

impl FitOptions {
    pub fn with_penalizer(penalizer: f64) -> Self {
        Self {
            penalizer,
            refine_top: 3,
            nelder_mead: NelderMeadOptions::default(),
        }
    }
}

/// Fitted BG/NBD model.
#[derive(Debug, Clone)]
pub struct BgNbdFit {
    pub params: BgNbdParams,
    pub diagnostics: FitDiagnostics,
}

/// Fitted Gamma-Gamma model.
#[derive(Debug, Clone)]
pub struct GammaGammaFit {
    pub params: GammaGammaParams,
    pub diagnostics: FitDiagnostics,
    /// Frequency/monetary correlation among the customers used in the fit.
    pub frequency_monetary_corr: Option<f64>,
}

/// A compressed BG/NBD observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfmRow {
    pub x: f64,
    pub t_x: f64,
    pub t: f64,
    pub weight: f64,
}

/// A compressed Gamma-Gamma observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendRow {
    pub x: f64,
    pub m: f64,
    pub weight: f64,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    minimum: Minimum,
}

/// Fit BG/NBD by penalized maximum likelihood.
pub fn fit_bgnbd(customers: &[CustomerSummary], opts: &FitOptions) -> Result<BgNbdFit, AppError> {
    if customers.is_empty() {
        return Err(AppError::data("No customers to fit the BG/NBD model on."));
    }
    validate_penalizer(opts.penalizer)?;
    // Without any repeat purchase the likelihood keeps improving as r -> 0.
    if customers.iter().all(|c| c.frequency == 0) {
        return Err(AppError::data(
            "BG/NBD needs at least one repeat customer; every customer bought on a single day.",
        ));
    }

    let max_t = customers.iter().map(|c| c.t).fold(0.0_f64, f64::max);
    if !(max_t.is_finite() && max_t > 0.0) {
        return Err(AppError::data(
            "BG/NBD needs at least one customer with a positive observation period.",
        ));
    }
    let scale = TIME_SCALE_TARGET / max_t;

    let rows: Vec<RfmRow> = compress_rfm(customers)
        .into_iter()
        .map(|r| RfmRow {
            t_x: r.t_x * scale,
            t: r.t * scale,
            ..r
        })
        .collect();
    debug!(customers = customers.len(), rows = rows.len(), scale, "fitting BG/NBD");

    let total_weight: f64 = rows.iter().map(|r| r.weight).sum();
    let penalizer = opts.penalizer;
    let objective = |log_params: &DVector<f64>| {
        let params = bgnbd_from_log(log_params);
        let ll: f64 = rows
            .iter()
            .map(|r| r.weight * bgnbd::log_likelihood(&params, r.x, r.t_x, r.t))
            .sum();
        -ll / total_weight + penalizer * log_params.iter().map(|v| v.exp().powi(2)).sum::<f64>()
    };

    let starts = log_start_grid(4, &BGNBD_GRID, DEFAULT_LOG_START)?;
    let best = multi_start(&objective, &starts, opts, "BG/NBD")?;

    let mut params = bgnbd_from_log(&best.minimum.x);
    params.alpha /= scale;
    if ![params.r, params.alpha, params.a, params.b]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    {
        return Err(AppError::fit(format!("BG/NBD fit produced invalid parameters: {params:?}")));
    }

    let diagnostics = diagnostics(&best, customers.len());
    info!(
        r = params.r,
        alpha = params.alpha,
        a = params.a,
        b = params.b,
        objective = diagnostics.objective,
        converged = diagnostics.converged,
        "BG/NBD fitted"
    );
    if !diagnostics.converged {
        warn!(iterations = diagnostics.iterations, "BG/NBD optimizer hit the iteration limit");
    }

    Ok(BgNbdFit { params, diagnostics })
}

/// Fit Gamma-Gamma by penalized maximum likelihood on repeat customers.
pub fn fit_gamma_gamma(customers: &[CustomerSummary], opts: &FitOptions) -> Result<GammaGammaFit, AppError> {
    validate_penalizer(opts.penalizer)?;

    let repeat: Vec<&CustomerSummary> = customers
        .iter()
        .filter(|c| c.frequency > 0 && c.monetary_value > 0.0 && c.monetary_value.is_finite())
        .collect();
    if repeat.is_empty() {
        return Err(AppError::data(
            "Gamma-Gamma needs at least one repeat customer with positive spend.",
        ));
    }

    let freq: Vec<f64> = repeat.iter().map(|c| f64::from(c.frequency)).collect();
    let spend: Vec<f64> = repeat.iter().map(|c| c.monetary_value).collect();
    let frequency_monetary_corr = pearson(&freq, &spend);
    if let Some(rho) = frequency_monetary_corr {
        if rho.abs() > CORRELATION_WARN {
            warn!(
                rho,
                "frequency and monetary value are correlated; Gamma-Gamma assumes independence"
            );
        }
    }

    let rows = compress_spend(&repeat);
    debug!(customers = repeat.len(), rows = rows.len(), "fitting Gamma-Gamma");

    let total_weight: f64 = rows.iter().map(|r| r.weight).sum();
    let penalizer = opts.penalizer;
    let objective = |log_params: &DVector<f64>| {
        let params = gamma_gamma_from_log(log_params);
        let nll: f64 = rows
            .iter()
            .map(|r| r.weight * gamma_gamma::negative_log_likelihood(&params, r.x, r.m))
            .sum();
        nll / total_weight + penalizer * log_params.iter().map(|v| v.exp().powi(2)).sum::<f64>()
    };

    let starts = log_start_grid(3, &GAMMA_GAMMA_GRID, DEFAULT_LOG_START)?;
    let best = multi_start(&objective, &starts, opts, "Gamma-Gamma")?;
    let params = gamma_gamma_from_log(&best.minimum.x);

    // `q` only reaches 1 when exp(θ_q) underflows; the mean spend is then undefined.
    if ![params.p, params.q, params.v].iter().all(|v| v.is_finite() && *v > 0.0) || params.q <= 1.0 {
        return Err(AppError::fit(format!(
            "Gamma-Gamma fit produced invalid parameters: {params:?}"
        )));
    }

    let diagnostics = diagnostics(&best, repeat.len());
    info!(
        p = params.p,
        q = params.q,
        v = params.v,
        objective = diagnostics.objective,
        converged = diagnostics.converged,
        "Gamma-Gamma fitted"
    );
    if !diagnostics.converged {
        warn!(iterations = diagnostics.iterations, "Gamma-Gamma optimizer hit the iteration limit");
    }

    Ok(GammaGammaFit {
        params,
        diagnostics,
        frequency_monetary_corr,
    })
}

/// Collapse customers with identical `(x, t_x, T)` into weighted rows.
pub fn compress_rfm(customers: &[CustomerSummary]) -> Vec<RfmRow> {
    // Durations are whole days, so the float bits are a stable key.
    let mut groups: BTreeMap<(u32, u64, u64), f64> = BTreeMap::new();
    for c in customers {
        *groups
            .entry((c.frequency, c.recency.to_bits(), c.t.to_bits()))
            .or_insert(0.0) += 1.0;
    }
    groups
        .into_iter()
        .map(|((x, t_x, t), weight)| RfmRow {
            x: f64::from(x),
            t_x: f64::from_bits(t_x),
            t: f64::from_bits(t),
            weight,
        })
        .collect()
}

fn compress_spend(customers: &[&CustomerSummary]) -> Vec<SpendRow> {
    let mut groups: BTreeMap<(u32, u64), f64> = BTreeMap::new();
    for c in customers {
        *groups
            .entry((c.frequency, c.monetary_value.to_bits()))
            .or_insert(0.0) += 1.0;
    }
    groups
        .into_iter()
        .map(|((x, m), weight)| SpendRow {
            x: f64::from(x),
            m: f64::from_bits(m),
            weight,
        })
        .collect()
}

fn multi_start<F>(
    objective: &F,
    starts: &[DVector<f64>],
    opts: &FitOptions,
    label: &str,
) -> Result<Candidate, AppError>
where
    F: Fn(&DVector<f64>) -> f64 + Sync,
{
    // Screen every start with a single evaluation (parallel).
    let mut screened: Vec<(usize, f64)> = starts
        .par_iter()
        .enumerate()
        .map(|(idx, x0)| (idx, objective(x0)))
        .filter(|(_, f)| f.is_finite())
        .collect();
    if screened.is_empty() {
        return Err(AppError::fit(format!(
            "{label}: the likelihood is not finite at any starting point."
        )));
    }
    screened.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    // The default start (index 0) is always refined.
    let mut chosen: Vec<usize> = screened
        .iter()
        .take(opts.refine_top.max(1))
        .map(|(idx, _)| *idx)
        .collect();
    if !chosen.contains(&0) && screened.iter().any(|(idx, _)| *idx == 0) {
        chosen.push(0);
    }

    let candidates: Vec<Candidate> = chosen
        .par_iter()
        .map(|&idx| {
            let minimum = minimize(|x| objective(x), &starts[idx], &opts.nelder_mead);
            debug!(
                label,
                start = idx,
                objective = minimum.fx,
                iterations = minimum.iterations,
                "refined start"
            );
            Candidate { idx, minimum }
        })
        .filter(|c| c.minimum.fx.is_finite() && c.minimum.x.iter().all(|v| v.is_finite()))
        .collect();

    candidates
        .into_iter()
        .min_by(|a, b| {
            a.minimum
                .fx
                .total_cmp(&b.minimum.fx)
                .then(a.idx.cmp(&b.idx))
        })
        .ok_or_else(|| AppError::fit(format!("{label}: optimizer produced no finite optimum.")))
}

fn diagnostics(best: &Candidate, n_customers: usize) -> FitDiagnostics {
    FitDiagnostics {
        objective: best.minimum.fx,
        iterations: best.minimum.iterations,
        converged: best.minimum.converged,
        n_customers,
        start_index: best.idx,
    }
}

fn validate_penalizer(penalizer: f64) -> Result<(), AppError> {
    if penalizer.is_finite() && penalizer >= 0.0 {
        Ok(())
    } else {
        Err(AppError::input(format!(
            "Invalid penalizer {penalizer} (must be finite and >= 0)."
        )))
    }
}

fn bgnbd_from_log(x: &DVector<f64>) -> BgNbdParams {
    BgNbdParams {
        r: x[0].exp(),
        alpha: x[1].exp(),
        a: x[2].exp(),
        b: x[3].exp(),
    }
}

fn gamma_gamma_from_log(x: &DVector<f64>) -> GammaGammaParams {
    GammaGammaParams {
        p: x[0].exp(),
        q: 1.0 + x[1].exp(),
        v: x[2].exp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{simulate_customers, SampleConfig};

    fn summary(id: &str, frequency: u32, recency: f64, t: f64, monetary_value: f64) -> CustomerSummary {
        CustomerSummary {
            customer_id: id.to_string(),
            frequency,
            recency,
            t,
            monetary_value,
        }
    }

    #[test]
    fn compress_rfm_merges_identical_histories() {
        let customers = vec![
            summary("a", 1, 10.0, 30.0, 5.0),
            summary("b", 1, 10.0, 30.0, 9.0),
            summary("c", 0, 0.0, 30.0, 0.0),
        ];
        let rows = compress_rfm(&customers);
        assert_eq!(rows.len(), 2);
        let total: f64 = rows.iter().map(|r| r.weight).sum();
        assert_eq!(total, 3.0);
        assert!(rows.iter().any(|r| r.x == 1.0 && r.weight == 2.0));
    }

    #[test]
    fn bgnbd_recovers_simulated_parameters_roughly() {
        let truth = BgNbdParams {
            r: 0.6,
            alpha: 20.0,
            a: 0.8,
            b: 2.5,
        };
        let config = SampleConfig {
            customers: 3000,
            bgnbd: truth,
            ..SampleConfig::default()
        };
        let customers = simulate_customers(&config).unwrap();
        let fit = fit_bgnbd(&customers, &FitOptions::with_penalizer(0.0)).unwrap();

        // Purchase-rate mean r/alpha is well identified even when r and alpha trade off.
        let rate_truth = truth.r / truth.alpha;
        let rate_fit = fit.params.r / fit.params.alpha;
        assert!((rate_fit / rate_truth - 1.0).abs() < 0.35, "rate {rate_fit} vs {rate_truth}");
        assert!(fit.diagnostics.objective.is_finite());
        assert_eq!(fit.diagnostics.n_customers, 3000);
    }

    #[test]
    fn gamma_gamma_fit_yields_finite_population_mean() {
        let customers: Vec<CustomerSummary> = (0..200)
            .map(|i| {
                let frequency = 1 + (i % 7) as u32;
                let monetary_value = 20.0 + ((i * 37) % 50) as f64;
                summary(&format!("c{i}"), frequency, 10.0, 100.0, monetary_value)
            })
            .chain((0..50).map(|i| summary(&format!("z{i}"), 0, 0.0, 50.0, 0.0)))
            .collect();

        let fit = fit_gamma_gamma(&customers, &FitOptions::with_penalizer(1e-4)).unwrap();
        assert!(fit.params.q > 1.0);
        assert_eq!(fit.diagnostics.n_customers, 200);
        let mean = gamma_gamma::population_mean(&fit.params);
        assert!(mean > 20.0 && mean < 70.0, "population mean {mean}");
    }

    #[test]
    fn gamma_gamma_default_penalizer_keeps_q_above_one() {
        for seed in [1, 42, 99] {
            let config = SampleConfig {
                customers: 500,
                seed,
                ..SampleConfig::default()
            };
            let customers = simulate_customers(&config).unwrap();
            let fit = fit_gamma_gamma(&customers, &FitOptions::with_penalizer(0.01)).unwrap();
            assert!(fit.params.q > 1.0, "seed {seed}: q = {}", fit.params.q);
            let mean = gamma_gamma::population_mean(&fit.params);
            assert!(mean.is_finite() && mean > 0.0, "seed {seed}: mean {mean}");
        }
    }

    #[test]
    fn default_start_is_the_lifetimes_start() {
        let starts = log_start_grid(3, &GAMMA_GAMMA_GRID, DEFAULT_LOG_START).unwrap();
        assert!(starts[0].iter().all(|&v| v == 0.1));
        let params = gamma_gamma_from_log(&starts[0]);
        assert_eq!(params.p, 0.1_f64.exp());
        assert_eq!(params.q, 1.0 + 0.1_f64.exp());
    }

    #[test]
    fn gamma_gamma_requires_repeat_customers() {
        let customers = vec![summary("a", 0, 0.0, 10.0, 0.0)];
        let err = fit_gamma_gamma(&customers, &FitOptions::with_penalizer(0.01)).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
    }

    #[test]
    fn negative_penalizer_is_rejected() {
        let customers = vec![summary("a", 1, 1.0, 10.0, 3.0)];
        assert!(fit_bgnbd(&customers, &FitOptions::with_penalizer(-1.0)).is_err());
    }
}
