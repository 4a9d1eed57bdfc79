//! Discounted customer lifetime value.
//!
//! For a horizon of `H` months and monthly discount rate `d` (months are 30 days):
//!
//! ```text
//! CLV = Σ_{k=1..H} m̂ · (E[X(30k)] − E[X(30(k−1))]) / (1 + d)^k
//! ```
//!
//! where `E[X(t)]` is the BG/NBD conditional expectation and `m̂` the
//! Gamma-Gamma conditional expected transaction value.

use crate::domain::{BgNbdParams, ClvRecord, ClvSettings, CustomerSummary, GammaGammaParams};
use crate::error::AppError;
use crate::models::bgnbd::{conditional_expected_purchases, probability_alive};
use crate::models::gamma_gamma::conditional_expected_average_profit;

/// Days per month used when stepping the horizon.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Discounted CLV of one customer.
pub fn customer_lifetime_value(
    bgnbd: &BgNbdParams,
    gamma_gamma: &GammaGammaParams,
    customer: &CustomerSummary,
    settings: &ClvSettings,
) -> f64 {
    let x = f64::from(customer.frequency);
    let spend = conditional_expected_average_profit(gamma_gamma, x, customer.monetary_value);

    let expected = |t: f64| conditional_expected_purchases(bgnbd, t, x, customer.recency, customer.t);

    let mut clv = 0.0;
    let mut prev = 0.0;
    for month in 1..=settings.horizon_months {
        let cumulative = expected(DAYS_PER_MONTH * f64::from(month));
        clv += spend * (cumulative - prev) / (1.0 + settings.discount_rate).powi(month as i32);
        prev = cumulative;
    }
    clv
}

/// CLV, probability alive and expected purchases for every customer.
pub fn predict_clv(
    bgnbd: &BgNbdParams,
    gamma_gamma: &GammaGammaParams,
    customers: &[CustomerSummary],
    settings: &ClvSettings,
) -> Result<Vec<ClvRecord>, AppError> {
    let horizon_days = DAYS_PER_MONTH * f64::from(settings.horizon_months);

    let mut out = Vec::with_capacity(customers.len());
    for c in customers {
        let x = f64::from(c.frequency);
        let clv = customer_lifetime_value(bgnbd, gamma_gamma, c, settings);
        let p_alive = probability_alive(bgnbd, x, c.recency, c.t);
        let expected_purchases = conditional_expected_purchases(bgnbd, horizon_days, x, c.recency, c.t);

        if !(clv.is_finite() && p_alive.is_finite() && expected_purchases.is_finite()) {
            return Err(AppError::fit(format!(
                "Non-finite prediction for customer '{}' (x={}, t_x={}, T={}).",
                c.customer_id, c.frequency, c.recency, c.t
            )));
        }

        out.push(ClvRecord {
            customer_id: c.customer_id.clone(),
            frequency: c.frequency,
            recency: c.recency,
            t: c.t,
            monetary_value: c.monetary_value,
            clv,
            p_alive,
            expected_purchases,
        });
    }
    Ok(out)
}
