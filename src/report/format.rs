//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::RunOutput;
use crate::domain::{ClvRecord, CustomerSummary, FitDiagnostics, RevenueSource, RfmRecord, RunConfig};
use crate::io::RowError;
use crate::math::{describe, Describe};
use crate::models::gamma_gamma::population_mean;

/// Row errors listed individually before the rest are counted.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Format the full run summary: inputs, samples, fit diagnostics, CLV stats.
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== clv - Customer Lifetime Value (BG/NBD + Gamma-Gamma) ===\n");
    out.push_str(&format!("Customers: {}\n", run.shapes.customers));
    out.push_str(&format!("Orders:    {}\n", run.shapes.orders));
    out.push_str(&format!("Products:  {}\n", run.shapes.products));
    match &run.revenue_source {
        RevenueSource::Column => out.push_str("Revenue column already exists, using existing values.\n"),
        RevenueSource::Derived { price_column } => {
            out.push_str(&format!("Revenue = quantity x {price_column}\n"));
        }
    }
    out.push_str(&format_row_errors(&run.row_errors));
    out.push_str(&format!("Snapshot date: {}\n", run.snapshot.date()));

    out.push_str("\nRFM sample:\n");
    out.push_str(&format_rfm_head(&run.rfm, config.sample_rows));

    out.push_str("\nLifetimes summary sample:\n");
    out.push_str(&format_summary_head(&run.summary, config.sample_rows));

    out.push_str("\nModel diagnostics:\n");
    let bg = &run.bgnbd.params;
    out.push_str(&format!(
        "- BG/NBD      r={:.4} alpha={:.4} a={:.4} b={:.4}\n",
        bg.r, bg.alpha, bg.a, bg.b
    ));
    out.push_str(&format_diagnostics(&run.bgnbd.diagnostics, config.bgnbd_penalizer));
    let gg = &run.gamma_gamma.params;
    out.push_str(&format!(
        "- Gamma-Gamma p={:.4} q={:.4} v={:.4} (mean spend {:.2})\n",
        gg.p,
        gg.q,
        gg.v,
        population_mean(gg)
    ));
    out.push_str(&format_diagnostics(&run.gamma_gamma.diagnostics, config.gamma_gamma_penalizer));
    if let Some(rho) = run.gamma_gamma.frequency_monetary_corr {
        out.push_str(&format!("  corr(frequency, monetary_value) = {rho:.4}\n"));
    }

    out.push_str(&format!(
        "\nCLV ({} months, discount {}/month):\n",
        config.clv.horizon_months, config.clv.discount_rate
    ));
    let clv: Vec<f64> = run.clv.iter().map(|r| r.clv).collect();
    match describe(&clv) {
        Some(d) => out.push_str(&format_describe(&d)),
        None => out.push_str("(no customers)\n"),
    }

    out
}

/// Summarize row-level problems (first few listed, the rest counted).
pub fn format_row_errors(errors: &[RowError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("Skipped rows: {}\n", errors.len());
    for e in errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        let id = e.id.as_deref().map(|id| format!(" [{id}]")).unwrap_or_default();
        out.push_str(&format!("  {}:{}{id} {}\n", e.file, e.line, e.message));
    }
    if errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS_SHOWN));
    }
    out
}

/// `describe()`-style block.
pub fn format_describe(d: &Describe) -> String {
    let rows = [
        ("count", d.count as f64),
        ("mean", d.mean),
        ("std", d.std),
        ("min", d.min),
        ("25%", d.q25),
        ("50%", d.median),
        ("75%", d.q75),
        ("max", d.max),
    ];
    let mut out = String::new();
    for (name, value) in rows {
        out.push_str(&format!("{name:<6} {value:>14.6}\n"));
    }
    out
}

/// Top customers by CLV.
pub fn format_rankings(rows: &[ClvRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Top {} customers by CLV:\n", rows.len()));
    out.push_str(
        format!(
            "{:<16} {:>9} {:>8} {:>8} {:>12} {:>12} {:>8} {:>10}\n",
            "customer_id", "frequency", "recency", "T", "monetary", "clv", "p_alive", "E[purch]"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<16} {:-<9} {:-<8} {:-<8} {:-<12} {:-<12} {:-<8} {:-<10}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<16} {:>9} {:>8.0} {:>8.0} {:>12.2} {:>12.2} {:>8.4} {:>10.4}\n",
                truncate(&r.customer_id, 16),
                r.frequency,
                r.recency,
                r.t,
                r.monetary_value,
                r.clv,
                r.p_alive,
                r.expected_purchases,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn format_diagnostics(d: &FitDiagnostics, penalizer: f64) -> String {
    format!(
        "  objective={:.6} iterations={} converged={} n={} start={} penalizer={}\n",
        d.objective, d.iterations, d.converged, d.n_customers, d.start_index, penalizer
    )
}

fn format_rfm_head(rows: &[RfmRecord], n: usize) -> String {
    let mut out = format!(
        "{:<16} {:>8} {:>9} {:>12}\n",
        "customer_id", "recency", "frequency", "monetary"
    );
    for r in rows.iter().take(n) {
        out.push_str(&format!(
            "{:<16} {:>8} {:>9} {:>12.2}\n",
            truncate(&r.customer_id, 16),
            r.recency,
            r.frequency,
            r.monetary
        ));
    }
    out
}

fn format_summary_head(rows: &[CustomerSummary], n: usize) -> String {
    let mut out = format!(
        "{:<16} {:>9} {:>8} {:>8} {:>14}\n",
        "customer_id", "frequency", "recency", "T", "monetary_value"
    );
    for r in rows.iter().take(n) {
        out.push_str(&format!(
            "{:<16} {:>9} {:>8.1} {:>8.1} {:>14.2}\n",
            truncate(&r.customer_id, 16),
            r.frequency,
            r.recency,
            r.t,
            r.monetary_value
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, clv: f64) -> ClvRecord {
        ClvRecord {
            customer_id: id.to_string(),
            frequency: 3,
            recency: 40.0,
            t: 60.0,
            monetary_value: 25.0,
            clv,
            p_alive: 0.91234,
            expected_purchases: 2.5,
        }
    }

    #[test]
    fn rankings_table_layout() {
        let txt = format_rankings(&[record("42", 123.456)]);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Top 1 customers by CLV:");
        assert!(lines[1].starts_with("customer_id"));
        assert!(lines[2].starts_with("----------------"));
        assert!(lines[3].starts_with("42"));
        assert!(lines[3].contains("123.46"));
        assert!(lines[3].contains("0.9123"));
    }

    #[test]
    fn long_ids_are_truncated() {
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn row_errors_are_capped() {
        let errors: Vec<RowError> = (0..12)
            .map(|i| RowError {
                file: "orders",
                line: i + 2,
                id: Some(format!("o{i}")),
                message: "bad quantity".to_string(),
            })
            .collect();
        let txt = format_row_errors(&errors);
        assert!(txt.starts_with("Skipped rows: 12\n"));
        assert!(txt.contains("  orders:2 [o0] bad quantity\n"));
        assert!(txt.ends_with("  ... and 2 more\n"));
        assert_eq!(format_row_errors(&[]), "");
    }

    #[test]
    fn describe_block_has_eight_rows() {
        let d = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let txt = format_describe(&d);
        assert_eq!(txt.lines().count(), 8);
        assert!(txt.starts_with("count        4.000000\n"));
    }
}
