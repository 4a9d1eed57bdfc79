//! Special functions needed by the BG/NBD closed forms.
//!
//! `ln_gamma` comes from `statrs`; the Gauss hypergeometric function is a plain
//! series evaluation because every call site has `0 <= z < 1`.

pub use statrs::function::gamma::ln_gamma;

const HYP_MAX_TERMS: usize = 500_000;
const HYP_REL_TOL: f64 = 1e-15;

/// Logistic sigmoid.
pub fn expit(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln(e^a + e^b)` without overflow.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp()).ln()
}

/// Gauss hypergeometric `₂F₁(a, b; c; z)` by direct series, for `0 <= z < 1`.
///
/// Returns `None` when the series overflows, fails to converge, or `c` is a
/// non-positive integer.
pub fn hyp2f1_series(a: f64, b: f64, c: f64, z: f64) -> Option<f64> {
    if !(0.0..1.0).contains(&z) || !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return None;
    }
    if c <= 0.0 && c.fract() == 0.0 {
        return None;
    }
    if z == 0.0 {
        return Some(1.0);
    }

    let mut term = 1.0_f64;
    let mut sum = 1.0_f64;
    for k in 0..HYP_MAX_TERMS {
        let kf = k as f64;
        term *= (a + kf) * (b + kf) / ((c + kf) * (kf + 1.0)) * z;
        if !term.is_finite() {
            return None;
        }
        sum += term;
        if !sum.is_finite() {
            return None;
        }
        // A zero term means `a` or `b` is a non-positive integer: the series terminates.
        if term == 0.0 || term.abs() <= HYP_REL_TOL * sum.abs() {
            return Some(sum);
        }
    }
    None
}

/// `ln ₂F₁(a, b; c; z)` for `0 <= z < 1`.
///
/// Tries the direct series first and falls back to the Euler transformation
/// `₂F₁(a,b;c;z) = (1−z)^(c−a−b) ₂F₁(c−a, c−b; c; z)`, which stays well scaled
/// when `a` and `b` grow with the purchase count.
pub fn ln_hyp2f1(a: f64, b: f64, c: f64, z: f64) -> Option<f64> {
    if let Some(v) = hyp2f1_series(a, b, c, z).filter(|v| *v > 0.0) {
        return Some(v.ln());
    }
    ln_hyp2f1_euler(a, b, c, z)
}

/// `ln ₂F₁(a, b; c; z)` evaluated through the Euler transformation only.
pub fn ln_hyp2f1_euler(a: f64, b: f64, c: f64, z: f64) -> Option<f64> {
    let v = hyp2f1_series(c - a, c - b, c, z).filter(|v| *v > 0.0)?;
    let out = v.ln() + (c - a - b) * (-z).ln_1p();
    out.is_finite().then_some(out)
}
