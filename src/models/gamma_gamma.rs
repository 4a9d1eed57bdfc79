//! Gamma-Gamma spend model.
//!
//! Transaction values of a customer are Gamma(p, ν) with ν ~ Gamma(q, v)
//! across customers. Only repeat purchases inform the model, so it is fitted
//! on customers with `frequency > 0`.

use crate::domain::GammaGammaParams;
use crate::math::ln_gamma;

/// Negative log-likelihood of a customer's mean spend `m` over `x` repeat purchases.
pub fn negative_log_likelihood(params: &GammaGammaParams, x: f64, m: f64) -> f64 {
    let GammaGammaParams { p, q, v } = *params;
    let px = p * x;
    -(ln_gamma(px + q) - ln_gamma(px) - ln_gamma(q) + q * v.ln() + (px - 1.0) * m.ln() + px * x.ln()
        - (px + q) * (x * m + v).ln())
}

/// Mean of the population spend distribution, `v·p / (q − 1)`.
///
/// Only finite for `q > 1`.
pub fn population_mean(params: &GammaGammaParams) -> f64 {
    params.v * params.p / (params.q - 1.0)
}

/// Expected mean transaction value given `x` repeat purchases averaging `m`.
///
/// A weighted blend of the population mean and the customer's own mean; the
/// customer's weight grows with `x`.
pub fn conditional_expected_average_profit(params: &GammaGammaParams, x: f64, m: f64) -> f64 {
    let GammaGammaParams { p, q, .. } = *params;
    let individual_weight = p * x / (p * x + q - 1.0);
    (1.0 - individual_weight) * population_mean(params) + individual_weight * m
}
