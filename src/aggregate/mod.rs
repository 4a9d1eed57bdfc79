//! Customer-level aggregation.
//!
//! - snapshot date + RFM table (`rfm`)
//! - daily-period transaction summary for the BG/NBD / Gamma-Gamma models (`summary`)
//! - revenue per product (for the bar chart)

pub mod rfm;
pub mod summary;

use std::cmp::Ordering;
use std::collections::HashMap;

pub use rfm::*;
pub use summary::*;

use crate::domain::Transaction;

/// Order ids the way a dataframe groupby would: numerically when both ids are
/// integers, lexicographically otherwise.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Total revenue per product id, ordered by id.
pub fn revenue_by_product(transactions: &[Transaction]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for t in transactions {
        *totals.entry(t.product_id.as_str()).or_insert(0.0) += t.revenue;
    }
    let mut out: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(id, revenue)| (id.to_string(), revenue))
        .collect();
    out.sort_by(|a, b| compare_ids(&a.0, &b.0));
    out
}
