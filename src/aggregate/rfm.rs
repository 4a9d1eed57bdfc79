//! Snapshot date and RFM aggregation.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};

use crate::aggregate::compare_ids;
use crate::domain::{RfmRecord, Transaction};
use crate::error::AppError;

/// Latest order timestamp plus one day.
///
/// This is the observation boundary for both the RFM table and the model summary.
pub fn snapshot_date(transactions: &[Transaction]) -> Result<NaiveDateTime, AppError> {
    let latest = transactions
        .iter()
        .map(|t| t.order_date)
        .max()
        .ok_or_else(|| AppError::data("Cannot compute a snapshot date without transactions."))?;
    Ok(latest + Duration::days(1))
}

/// Per-customer recency (days), frequency (order rows) and monetary (revenue sum).
pub fn compute_rfm(transactions: &[Transaction], snapshot: NaiveDateTime) -> Vec<RfmRecord> {
    struct Acc {
        last: NaiveDateTime,
        count: usize,
        revenue: f64,
    }

    let mut by_customer: HashMap<&str, Acc> = HashMap::new();
    for t in transactions {
        let acc = by_customer.entry(t.customer_id.as_str()).or_insert(Acc {
            last: t.order_date,
            count: 0,
            revenue: 0.0,
        });
        acc.last = acc.last.max(t.order_date);
        acc.count += 1;
        acc.revenue += t.revenue;
    }

    let mut out: Vec<RfmRecord> = by_customer
        .into_iter()
        .map(|(id, acc)| RfmRecord {
            customer_id: id.to_string(),
            recency: (snapshot - acc.last).num_days(),
            frequency: acc.count,
            monetary: acc.revenue,
        })
        .collect();
    out.sort_by(|a, b| compare_ids(&a.customer_id, &b.customer_id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(customer: &str, ymd: (i32, u32, u32), hour: u32, revenue: f64) -> Transaction {
        Transaction {
            customer_id: customer.to_string(),
            order_id: format!("{customer}-{}", ymd.2),
            order_date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            product_id: "p".to_string(),
            revenue,
        }
    }

    #[test]
    fn snapshot_is_one_day_after_latest_order() {
        let txs = vec![tx("a", (2024, 1, 1), 0, 1.0), tx("b", (2024, 1, 10), 15, 1.0)];
        let snapshot = snapshot_date(&txs).unwrap();
        assert_eq!(snapshot.to_string(), "2024-01-11 15:00:00");
        assert!(snapshot_date(&[]).is_err());
    }

    #[test]
    fn rfm_counts_rows_and_sums_revenue() {
        let txs = vec![
            tx("a", (2024, 1, 1), 9, 10.0),
            tx("a", (2024, 1, 1), 9, 5.0),
            tx("a", (2024, 1, 5), 9, 2.0),
            tx("b", (2024, 1, 10), 12, 7.0),
        ];
        let snapshot = snapshot_date(&txs).unwrap();
        let rfm = compute_rfm(&txs, snapshot);

        assert_eq!(rfm.len(), 2);
        assert_eq!(rfm[0].customer_id, "a");
        assert_eq!(rfm[0].frequency, 3);
        assert!((rfm[0].monetary - 17.0).abs() < 1e-12);
        // 2024-01-11 12:00 - 2024-01-05 09:00 = 6 days 3 hours
        assert_eq!(rfm[0].recency, 6);
        assert_eq!(rfm[1].recency, 1);
    }
}
