//! Reporting utilities: CLV rankings and formatted terminal output.

pub mod format;

pub use format::*;

use crate::aggregate::compare_ids;
use crate::domain::ClvRecord;

/// Top-N customers by CLV, highest first. Ties keep customer id order.
pub fn rank_by_clv(records: &[ClvRecord], top_n: usize) -> Vec<ClvRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        b.clv
            .total_cmp(&a.clv)
            .then_with(|| compare_ids(&a.customer_id, &b.customer_id))
    });
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, clv: f64) -> ClvRecord {
        ClvRecord {
            customer_id: id.to_string(),
            frequency: 1,
            recency: 1.0,
            t: 2.0,
            monetary_value: 1.0,
            clv,
            p_alive: 1.0,
            expected_purchases: 1.0,
        }
    }

    #[test]
    fn rank_by_clv_basic() {
        let records = vec![record("3", 5.0), record("10", 50.0), record("2", 5.0), record("1", 0.5)];
        let top = rank_by_clv(&records, 3);
        let ids: Vec<&str> = top.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, ["10", "2", "3"]);
        assert_eq!(rank_by_clv(&records, 0).len(), 0);
    }
}
