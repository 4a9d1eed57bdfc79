//! Nelder–Mead simplex minimizer.
//!
//! The likelihoods we fit have 3–4 parameters (in log space), no cheap
//! gradients, and are evaluated over a few thousand compressed customers, so a
//! derivative-free simplex search is accurate and fast enough.
//!
//! Coefficients follow the textbook choice: reflection 1, expansion 2,
//! contraction 0.5, shrink 0.5. Non-finite objective values are treated as
//! `+∞`, which keeps the simplex away from invalid regions.

use nalgebra::DVector;

const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Stopping rules.
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    pub max_iter: usize,
    /// Absolute tolerance on the simplex vertices.
    pub xatol: f64,
    /// Absolute tolerance on the objective values across the simplex.
    pub fatol: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iter: 4_000,
            xatol: 1e-8,
            fatol: 1e-10,
        }
    }
}

/// Result of a minimization.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub fx: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F>(f: F, x0: &DVector<f64>, opts: &NelderMeadOptions) -> Minimum
where
    F: Fn(&DVector<f64>) -> f64,
{
    let eval = |x: &DVector<f64>| {
        let v = f(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let n = x0.len();
    let mut sim: Vec<DVector<f64>> = Vec::with_capacity(n + 1);
    sim.push(x0.clone());
    for k in 0..n {
        let mut y = x0.clone();
        if y[k] != 0.0 {
            y[k] *= 1.05;
        } else {
            y[k] = 0.00025;
        }
        sim.push(y);
    }
    let mut fsim: Vec<f64> = sim.iter().map(|x| eval(x)).collect();

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < opts.max_iter {
        sort_simplex(&mut sim, &mut fsim);

        if simplex_converged(&sim, &fsim, opts) {
            converged = true;
            break;
        }

        let worst = n;
        let xbar = centroid(&sim[..worst]);

        let xr = &xbar * (1.0 + RHO) - &sim[worst] * RHO;
        let fxr = eval(&xr);
        let mut shrink = false;

        if fxr < fsim[0] {
            let xe = &xbar * (1.0 + RHO * CHI) - &sim[worst] * (RHO * CHI);
            let fxe = eval(&xe);
            if fxe < fxr {
                sim[worst] = xe;
                fsim[worst] = fxe;
            } else {
                sim[worst] = xr;
                fsim[worst] = fxr;
            }
        } else if fxr < fsim[worst - 1] {
            sim[worst] = xr;
            fsim[worst] = fxr;
        } else if fxr < fsim[worst] {
            // Outside contraction.
            let xc = &xbar * (1.0 + PSI * RHO) - &sim[worst] * (PSI * RHO);
            let fxc = eval(&xc);
            if fxc <= fxr {
                sim[worst] = xc;
                fsim[worst] = fxc;
            } else {
                shrink = true;
            }
        } else {
            // Inside contraction.
            let xcc = &xbar * (1.0 - PSI) + &sim[worst] * PSI;
            let fxcc = eval(&xcc);
            if fxcc < fsim[worst] {
                sim[worst] = xcc;
                fsim[worst] = fxcc;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = sim[0].clone();
            for j in 1..=n {
                sim[j] = &best + (&sim[j] - &best) * SIGMA;
                fsim[j] = eval(&sim[j]);
            }
        }

        iterations += 1;
    }

    sort_simplex(&mut sim, &mut fsim);
    Minimum {
        x: sim.swap_remove(0),
        fx: fsim[0],
        iterations,
        converged,
    }
}

fn sort_simplex(sim: &mut Vec<DVector<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    let sorted_sim: Vec<DVector<f64>> = order.iter().map(|&i| sim[i].clone()).collect();
    let sorted_f: Vec<f64> = order.iter().map(|&i| fsim[i]).collect();
    *sim = sorted_sim;
    *fsim = sorted_f;
}

fn simplex_converged(sim: &[DVector<f64>], fsim: &[f64], opts: &NelderMeadOptions) -> bool {
    let x_spread = sim[1..]
        .iter()
        .map(|v| (v - &sim[0]).amax())
        .fold(0.0_f64, f64::max);
    let f_spread = fsim[1..]
        .iter()
        .map(|v| (v - fsim[0]).abs())
        .fold(0.0_f64, f64::max);
    x_spread <= opts.xatol && f_spread <= opts.fatol
}

fn centroid(points: &[DVector<f64>]) -> DVector<f64> {
    let mut sum = DVector::<f64>::zeros(points[0].len());
    for p in points {
        sum += p;
    }
    sum / points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_shifted_quadratic() {
        let f = |x: &DVector<f64>| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2) + 0.5;
        let x0 = DVector::from_vec(vec![0.0, 0.0]);
        let min = minimize(f, &x0, &NelderMeadOptions::default());
        assert!(min.converged);
        assert!((min.x[0] - 3.0).abs() < 1e-4);
        assert!((min.x[1] + 1.0).abs() < 1e-4);
        assert!((min.fx - 0.5).abs() < 1e-8);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let f = |x: &DVector<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let x0 = DVector::from_vec(vec![-1.2, 1.0]);
        let opts = NelderMeadOptions {
            max_iter: 10_000,
            ..NelderMeadOptions::default()
        };
        let min = minimize(f, &x0, &opts);
        assert!((min.x[0] - 1.0).abs() < 1e-3);
        assert!((min.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_regions_are_avoided() {
        // ln(x) is undefined for x <= 0; the minimum of x - ln(x) is at x = 1.
        let f = |x: &DVector<f64>| x[0] - x[0].ln();
        let x0 = DVector::from_vec(vec![4.0]);
        let min = minimize(f, &x0, &NelderMeadOptions::default());
        assert!((min.x[0] - 1.0).abs() < 1e-4);
    }
}
