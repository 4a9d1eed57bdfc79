//! CLV summary CSV export and read-back.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts; the `plot` command reads it back.

use std::fs;
use std::path::Path;

use crate::domain::ClvRecord;
use crate::error::AppError;

/// Numeric columns of `clv_summary.csv`, in file order.
pub const CLV_NUMERIC_COLUMNS: [&str; 7] = [
    "frequency",
    "recency",
    "T",
    "monetary_value",
    "clv",
    "p_alive",
    "expected_purchases",
];

/// Write the per-customer CLV table. The parent directory is created if needed.
pub fn write_clv_summary_csv(path: &Path, records: &[ClvRecord]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::input(format!("Failed to create output directory '{}': {e}", parent.display()))
        })?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }
    if records.is_empty() {
        // serde only emits the header alongside the first row.
        writer
            .write_record(std::iter::once("customer_id").chain(CLV_NUMERIC_COLUMNS))
            .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write export CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Read a previously saved `clv_summary.csv`.
pub fn read_clv_summary(path: &Path) -> Result<Vec<ClvRecord>, AppError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to open CLV summary '{}': {e}", path.display())))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            // +2: one for the header, one for 1-based lines.
            row.map_err(|e| AppError::input(format!("Invalid CLV summary row at line {}: {e}", i + 2)))
        })
        .collect()
}

/// Extract one numeric column by its CSV header name.
pub fn clv_column(records: &[ClvRecord], column: &str) -> Result<Vec<f64>, AppError> {
    let pick: fn(&ClvRecord) -> f64 = match column {
        "frequency" => |r| f64::from(r.frequency),
        "recency" => |r| r.recency,
        "T" => |r| r.t,
        "monetary_value" => |r| r.monetary_value,
        "clv" => |r| r.clv,
        "p_alive" => |r| r.p_alive,
        "expected_purchases" => |r| r.expected_purchases,
        other => {
            return Err(AppError::input(format!(
                "Unknown column '{other}'. Expected one of: {}.",
                CLV_NUMERIC_COLUMNS.join(", ")
            )));
        }
    };
    Ok(records.iter().map(pick).collect())
}
