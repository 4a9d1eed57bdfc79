//! BG/NBD (beta-geometric / negative binomial) purchase model.
//!
//! While active, a customer buys with Poisson rate λ ~ Gamma(r, α); after every
//! purchase they drop out with probability p ~ Beta(a, b).
//!
//! Inputs per customer are `(x, t_x, T)` = (repeat purchases, recency, age),
//! all in days.

use crate::domain::BgNbdParams;
use crate::math::{expit, ln_gamma, ln_hyp2f1, log_add_exp};

/// Log-likelihood of one customer's `(x, t_x, T)`.
pub fn log_likelihood(params: &BgNbdParams, x: f64, t_x: f64, t: f64) -> f64 {
    let BgNbdParams { r, alpha, a, b } = *params;

    let a1 = ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln();
    let a2 = ln_gamma(a + b) + ln_gamma(b + x) - ln_gamma(b) - ln_gamma(a + b + x);
    let a3 = -(r + x) * (alpha + t).ln();
    let a4 = if x > 0.0 {
        a.ln() - (b + x - 1.0).ln() - (r + x) * (alpha + t_x).ln()
    } else {
        f64::NEG_INFINITY
    };

    a1 + a2 + log_add_exp(a3, a4)
}

/// Expected purchases in `(T, T + t]` for a customer with history `(x, t_x, T)`.
///
/// Returns NaN when the hypergeometric term cannot be evaluated.
pub fn conditional_expected_purchases(params: &BgNbdParams, t: f64, x: f64, t_x: f64, big_t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let BgNbdParams { r, alpha, a, b } = *params;

    let hyp_a = r + x;
    let hyp_b = b + x;
    let hyp_c = a + b + x - 1.0;
    let z = t / (alpha + big_t + t);
    let Some(ln_hyp) = ln_hyp2f1(hyp_a, hyp_b, hyp_c, z) else {
        return f64::NAN;
    };

    let first = (a + b + x - 1.0) / (a - 1.0);
    let second = 1.0 - (ln_hyp + (r + x) * ((alpha + big_t) / (alpha + t + big_t)).ln()).exp();
    let numerator = first * second;

    let denominator = if x > 0.0 {
        1.0 + (a / (b + x - 1.0)) * ((alpha + big_t) / (alpha + t_x)).powf(r + x)
    } else {
        1.0
    };

    numerator / denominator
}

/// Expected purchases in `(0, t]` for a new customer.
pub fn expected_purchases(params: &BgNbdParams, t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let BgNbdParams { r, alpha, a, b } = *params;
    let Some(ln_hyp) = ln_hyp2f1(r, b, a + b - 1.0, t / (alpha + t)) else {
        return f64::NAN;
    };
    (a + b - 1.0) / (a - 1.0) * (1.0 - (ln_hyp + r * (alpha / (alpha + t)).ln()).exp())
}

/// Probability that a customer with history `(x, t_x, T)` is still active at `T`.
pub fn probability_alive(params: &BgNbdParams, x: f64, t_x: f64, big_t: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let BgNbdParams { r, alpha, a, b } = *params;
    let log_div = (r + x) * ((alpha + big_t) / (alpha + t_x)).ln() + (a / (b + x.max(1.0) - 1.0)).ln();
    expit(-log_div)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: BgNbdParams = BgNbdParams {
        r: 0.5,
        alpha: 10.0,
        a: 1.5,
        b: 3.0,
    };

    fn ln_beta(x: f64, y: f64) -> f64 {
        ln_gamma(x) + ln_gamma(y) - ln_gamma(x + y)
    }

    #[test]
    fn likelihood_without_repeats_is_no_purchase_probability() {
        // For x = 0 the likelihood reduces to (α / (α + T))^r.
        let ll = log_likelihood(&PARAMS, 0.0, 0.0, 40.0);
        assert_relative_eq!(ll, PARAMS.r * (10.0_f64 / 50.0).ln(), max_relative = 1e-12);
    }

    #[test]
    fn likelihood_matches_beta_function_form() {
        let (r, alpha, a, b) = (PARAMS.r, PARAMS.alpha, PARAMS.a, PARAMS.b);
        let (x, t_x, t) = (3.0_f64, 20.0_f64, 45.0_f64);

        let common = ln_gamma(r + x) + r * alpha.ln() - ln_gamma(r);
        let alive = ln_beta(a, b + x) - ln_beta(a, b) + common - (r + x) * (alpha + t).ln();
        let dropped = ln_beta(a + 1.0, b + x - 1.0) - ln_beta(a, b) + common - (r + x) * (alpha + t_x).ln();
        let expected = (alive.exp() + dropped.exp()).ln();

        assert_relative_eq!(log_likelihood(&PARAMS, x, t_x, t), expected, max_relative = 1e-10);
    }

    #[test]
    fn conditional_expectation_grows_with_horizon() {
        assert_eq!(conditional_expected_purchases(&PARAMS, 0.0, 2.0, 10.0, 30.0), 0.0);
        let mut prev = 0.0;
        for step in 1..=12 {
            let v = conditional_expected_purchases(&PARAMS, 30.0 * step as f64, 2.0, 10.0, 30.0);
            assert!(v.is_finite());
            assert!(v > prev);
            prev = v;
        }
    }

    #[test]
    fn brand_new_customer_matches_unconditional_expectation() {
        for &t in &[7.0, 30.0, 365.0] {
            assert_relative_eq!(
                conditional_expected_purchases(&PARAMS, t, 0.0, 0.0, 0.0),
                expected_purchases(&PARAMS, t),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn heavy_buyers_stay_finite() {
        // Large x pushes the direct series towards overflow.
        let v = conditional_expected_purchases(&PARAMS, 360.0, 400.0, 395.0, 400.0);
        assert!(v.is_finite());
        assert!(v > 0.0);
    }

    #[test]
    fn probability_alive_behaviour() {
        assert_eq!(probability_alive(&PARAMS, 0.0, 0.0, 100.0), 1.0);
        let recent = probability_alive(&PARAMS, 5.0, 95.0, 100.0);
        let stale = probability_alive(&PARAMS, 5.0, 20.0, 100.0);
        assert!(recent > stale);
        assert!((0.0..=1.0).contains(&recent));
        assert!((0.0..=1.0).contains(&stale));
    }
}
