//! CSV ingest and normalization.
//!
//! This module turns the three input exports (customers, orders, products) into
//! typed rows that are safe to join and aggregate.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No business logic**: revenue resolution lives in `data::enrich`

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::domain::{CustomerRow, OrderRow, ProductRow, TableShape};
use crate::error::AppError;

type HeaderMap = HashMap<String, usize>;

/// The first column whose lowercased name contains `price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceColumn {
    pub index: usize,
    /// Header as written in the file (trimmed).
    pub name: String,
}

/// Optional columns that matter for revenue resolution.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    pub price_column: Option<PriceColumn>,
    pub has_revenue: bool,
    pub has_quantity: bool,
}

/// A row-level error encountered during ingest or enrichment.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: &'static str,
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// A loaded table: typed rows + shape + row errors.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub shape: TableShape,
    pub columns: ColumnInfo,
    pub row_errors: Vec<RowError>,
}

/// Load `customers.csv`. Only `customer_id` is required.
pub fn load_customers(path: &Path) -> Result<Table<CustomerRow>, AppError> {
    read_table(path, "customers", "customer_id", &["customer_id"], |record, headers, _| {
        let customer_id = get_required(record, headers, "customer_id")?.to_string();
        Ok(CustomerRow { customer_id })
    })
}

/// Load `orders.csv`.
///
/// `quantity`, the price-like column and `revenue` are parsed when present;
/// whether they are actually needed is decided during enrichment.
pub fn load_orders(path: &Path) -> Result<Table<OrderRow>, AppError> {
    let table = read_table(
        path,
        "orders",
        "order_id",
        &["customer_id", "order_id", "order_date", "product_id"],
        |record, headers, columns| {
            let customer_id = get_required(record, headers, "customer_id")?.to_string();
            let order_id = get_required(record, headers, "order_id")?.to_string();
            let order_date = parse_datetime(get_required(record, headers, "order_date")?)?;
            let product_id = get_required(record, headers, "product_id")?.to_string();

            let quantity = parse_opt_f64(get_optional(record, headers, "quantity"));
            let price = columns
                .price_column
                .as_ref()
                .and_then(|c| record.get(c.index))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| parse_opt_f64(Some(s)));
            let revenue = parse_opt_f64(get_optional(record, headers, "revenue"));

            Ok(OrderRow {
                line: 0,
                customer_id,
                order_id,
                order_date,
                product_id,
                quantity,
                price,
                revenue,
            })
        },
    )?;

    if table.rows.is_empty() {
        return Err(AppError::data(format!(
            "No usable order rows in '{}'.",
            path.display()
        )));
    }
    Ok(table)
}

/// Load `products.csv`. Only `product_id` is required.
pub fn load_products(path: &Path) -> Result<Table<ProductRow>, AppError> {
    read_table(path, "products", "product_id", &["product_id"], |record, headers, columns| {
        let product_id = get_required(record, headers, "product_id")?.to_string();
        let price = columns
            .price_column
            .as_ref()
            .and_then(|c| record.get(c.index))
            .and_then(|s| parse_opt_f64(Some(s.trim())));
        let revenue = parse_opt_f64(get_optional(record, headers, "revenue"));
        Ok(ProductRow {
            line: 0,
            product_id,
            price,
            revenue,
        })
    })
}

/// Rows that know their source line.
trait Located {
    fn set_line(&mut self, line: usize);
}

impl Located for CustomerRow {
    fn set_line(&mut self, _line: usize) {}
}

impl Located for OrderRow {
    fn set_line(&mut self, line: usize) {
        self.line = line;
    }
}

impl Located for ProductRow {
    fn set_line(&mut self, line: usize) {
        self.line = line;
    }
}

fn read_table<T, F>(
    path: &Path,
    file: &'static str,
    id_column: &str,
    required: &[&str],
    parse: F,
) -> Result<Table<T>, AppError>
where
    T: Located,
    F: Fn(&StringRecord, &HeaderMap, &ColumnInfo) -> Result<T, String>,
{
    let handle = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open {file} CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(handle);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read {file} CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    for name in required {
        if !header_map.contains_key(*name) {
            return Err(AppError::input(format!(
                "Missing required column in {file} CSV: `{name}`"
            )));
        }
    }

    let columns = ColumnInfo {
        price_column: find_price_column(&headers),
        has_revenue: header_map.contains_key("revenue"),
        has_quantity: header_map.contains_key("quantity"),
    };

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    file,
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse(&record, &header_map, &columns) {
            Ok(mut row) => {
                row.set_line(line);
                rows.push(row);
            }
            Err(message) => row_errors.push(RowError {
                file,
                line,
                id: get_optional(&record, &header_map, id_column).map(str::to_string),
                message,
            }),
        }
    }

    debug!(
        file,
        rows_read,
        rows_used = rows.len(),
        skipped = row_errors.len(),
        "loaded table"
    );

    Ok(Table {
        rows,
        shape: TableShape {
            rows: rows_read,
            columns: headers.len(),
        },
        columns,
        row_errors,
    })
}

fn build_header_map(headers: &StringRecord) -> HeaderMap {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_price_column(headers: &StringRecord) -> Option<PriceColumn> {
    headers.iter().enumerate().find_map(|(index, name)| {
        if normalize_header_name(name).contains("price") {
            Some(PriceColumn {
                index,
                name: name.trim().trim_start_matches('\u{feff}').to_string(),
            })
        } else {
            None
        }
    })
}

fn get_required<'a>(record: &'a StringRecord, headers: &HeaderMap, name: &str) -> Result<&'a str, String> {
    let idx = headers
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, headers: &HeaderMap, name: &str) -> Option<&'a str> {
    let idx = headers.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an order timestamp.
///
/// Date-only values map to midnight.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
    ];
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

    let s = s.trim();
    // Fractional seconds and offsets are dropped; orders are bucketed by day anyway.
    let s = s.split('.').next().unwrap_or(s);
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("Invalid date '{s}'."));
        }
    }
    Err(format!(
        "Invalid order_date '{s}'. Expected YYYY-MM-DD[ HH:MM[:SS]], MM/DD/YYYY[ HH:MM], DD-MM-YYYY or YYYY/MM/DD."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
