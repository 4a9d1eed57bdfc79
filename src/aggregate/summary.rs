//! Transaction summary in the shape the BG/NBD and Gamma-Gamma models expect.
//!
//! Purchases are bucketed into daily periods first, so several orders on the
//! same calendar day count as one purchase with their revenue summed.
//!
//! Per customer:
//! - `frequency` = distinct purchase days − 1 (repeat purchases only)
//! - `recency`   = days from first to last purchase day
//! - `T`         = days from first purchase day to the observation end
//! - `monetary_value` = mean revenue over the repeat purchase days (0 if none)

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};

use crate::aggregate::compare_ids;
use crate::domain::{CustomerSummary, Transaction};

/// Summarize transactions up to (and including) the day of `observation_end`.
pub fn summarize_transactions(
    transactions: &[Transaction],
    observation_end: NaiveDateTime,
) -> Vec<CustomerSummary> {
    let end_day = observation_end.date();

    let mut daily: HashMap<&str, BTreeMap<NaiveDate, f64>> = HashMap::new();
    for t in transactions {
        let day = t.order_date.date();
        if day > end_day {
            continue;
        }
        *daily
            .entry(t.customer_id.as_str())
            .or_default()
            .entry(day)
            .or_insert(0.0) += t.revenue;
    }

    let mut out: Vec<CustomerSummary> = daily
        .into_iter()
        .filter_map(|(id, days)| summarize_customer(id, &days, end_day))
        .collect();
    out.sort_by(|a, b| compare_ids(&a.customer_id, &b.customer_id));
    out
}

fn summarize_customer(
    customer_id: &str,
    days: &BTreeMap<NaiveDate, f64>,
    end_day: NaiveDate,
) -> Option<CustomerSummary> {
    let (&first, _) = days.iter().next()?;
    let (&last, _) = days.iter().next_back()?;

    let frequency = days.len().saturating_sub(1);
    // The first purchase carries no information about repeat spend.
    let repeat_revenue: f64 = days.values().skip(1).sum();
    let monetary_value = if frequency > 0 {
        repeat_revenue / frequency as f64
    } else {
        0.0
    };

    Some(CustomerSummary {
        customer_id: customer_id.to_string(),
        frequency: u32::try_from(frequency).unwrap_or(u32::MAX),
        recency: (last - first).num_days() as f64,
        t: (end_day - first).num_days() as f64,
        monetary_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn tx(customer: &str, when: NaiveDateTime, revenue: f64) -> Transaction {
        Transaction {
            customer_id: customer.to_string(),
            order_id: "o".to_string(),
            order_date: when,
            product_id: "p".to_string(),
            revenue,
        }
    }

    #[test]
    fn same_day_orders_collapse_into_one_period() {
        let txs = vec![
            tx("a", at(1, 9), 10.0),
            tx("a", at(1, 17), 5.0),
            tx("a", at(4, 10), 20.0),
            tx("a", at(4, 11), 4.0),
            tx("a", at(8, 12), 6.0),
            tx("b", at(9, 8), 50.0),
        ];
        let end = at(9, 8) + Duration::days(1);
        let summary = summarize_transactions(&txs, end);

        assert_eq!(summary.len(), 2);
        let a = &summary[0];
        assert_eq!(a.frequency, 2);
        assert_eq!(a.recency, 7.0);
        assert_eq!(a.t, 9.0);
        // repeat days: 24 + 6
        assert!((a.monetary_value - 15.0).abs() < 1e-12);

        let b = &summary[1];
        assert_eq!(b.frequency, 0);
        assert_eq!(b.recency, 0.0);
        assert_eq!(b.t, 1.0);
        assert_eq!(b.monetary_value, 0.0);
    }

    #[test]
    fn transactions_after_observation_end_are_ignored() {
        let txs = vec![tx("a", at(1, 0), 1.0), tx("a", at(20, 0), 1.0)];
        let summary = summarize_transactions(&txs, at(10, 0));
        assert_eq!(summary[0].frequency, 0);
        assert_eq!(summary[0].t, 9.0);
    }
}
