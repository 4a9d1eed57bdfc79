//! Order/product join and revenue resolution.
//!
//! Orders are left-joined with products on `product_id`. Revenue comes from an
//! existing `revenue` column when exactly one table has it; otherwise it is
//! derived once as `quantity × price`, where the price column is the first
//! price-like column of the orders file, else of the products file.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::{OrderRow, ProductRow, RevenueSource, Transaction};
use crate::error::AppError;
use crate::io::ingest::{RowError, Table};

/// Joined orders with resolved revenue.
#[derive(Debug, Clone)]
pub struct EnrichedOrders {
    pub transactions: Vec<Transaction>,
    pub revenue_source: RevenueSource,
    pub row_errors: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Orders,
    Products,
}

/// Join orders with products and resolve per-order revenue.
pub fn enrich_orders(
    orders: &Table<OrderRow>,
    products: &Table<ProductRow>,
) -> Result<EnrichedOrders, AppError> {
    let mut row_errors = Vec::new();
    let catalog = index_products(&products.rows, &mut row_errors);

    let (revenue_source, side) = resolve_revenue_source(orders, products)?;
    match &revenue_source {
        RevenueSource::Column => info!("Revenue column already exists, using existing values."),
        RevenueSource::Derived { price_column } => {
            info!(price_column = %price_column, "deriving revenue as quantity x price");
        }
    }

    let mut transactions = Vec::with_capacity(orders.rows.len());
    for order in &orders.rows {
        let product = catalog.get(order.product_id.as_str()).copied();
        match order_revenue(order, product, &revenue_source, side) {
            Ok(revenue) => transactions.push(Transaction {
                customer_id: order.customer_id.clone(),
                order_id: order.order_id.clone(),
                order_date: order.order_date,
                product_id: order.product_id.clone(),
                revenue,
            }),
            Err(message) => row_errors.push(RowError {
                file: "orders",
                line: order.line,
                id: Some(order.order_id.clone()),
                message,
            }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "rows skipped during enrichment");
    }
    if transactions.is_empty() {
        return Err(AppError::data(
            "No orders with a resolvable revenue remain after the product join.",
        ));
    }

    Ok(EnrichedOrders {
        transactions,
        revenue_source,
        row_errors,
    })
}

fn index_products<'a>(
    rows: &'a [ProductRow],
    row_errors: &mut Vec<RowError>,
) -> HashMap<&'a str, &'a ProductRow> {
    let mut catalog: HashMap<&str, &ProductRow> = HashMap::with_capacity(rows.len());
    for row in rows {
        if catalog.contains_key(row.product_id.as_str()) {
            row_errors.push(RowError {
                file: "products",
                line: row.line,
                id: Some(row.product_id.clone()),
                message: "Duplicate `product_id` (first occurrence wins).".to_string(),
            });
            continue;
        }
        catalog.insert(row.product_id.as_str(), row);
    }
    catalog
}

fn resolve_revenue_source(
    orders: &Table<OrderRow>,
    products: &Table<ProductRow>,
) -> Result<(RevenueSource, Side), AppError> {
    // When both tables carry `revenue`, a merge would suffix both columns, so
    // neither counts as an existing revenue column.
    match (orders.columns.has_revenue, products.columns.has_revenue) {
        (true, false) => return Ok((RevenueSource::Column, Side::Orders)),
        (false, true) => return Ok((RevenueSource::Column, Side::Products)),
        _ => {}
    }

    let (price_column, side) = if let Some(c) = &orders.columns.price_column {
        (c.name.clone(), Side::Orders)
    } else if let Some(c) = &products.columns.price_column {
        (c.name.clone(), Side::Products)
    } else {
        return Err(AppError::input(
            "No price column found in orders/products after merge!",
        ));
    };

    if !orders.columns.has_quantity {
        return Err(AppError::input(
            "Revenue derivation requires a `quantity` column in the orders CSV.",
        ));
    }

    Ok((RevenueSource::Derived { price_column }, side))
}

fn order_revenue(
    order: &OrderRow,
    product: Option<&ProductRow>,
    source: &RevenueSource,
    side: Side,
) -> Result<f64, String> {
    let product_value = |pick: fn(&ProductRow) -> Option<f64>, what: &str| -> Result<f64, String> {
        let product = product.ok_or_else(|| {
            format!("Unknown product_id '{}' (no {what} available).", order.product_id)
        })?;
        pick(product).ok_or_else(|| format!("Missing/invalid product {what}."))
    };

    let revenue = match source {
        RevenueSource::Column => match side {
            Side::Orders => order
                .revenue
                .ok_or_else(|| "Missing/invalid `revenue` value.".to_string())?,
            Side::Products => product_value(|p| p.revenue, "revenue")?,
        },
        RevenueSource::Derived { .. } => {
            let quantity = order
                .quantity
                .ok_or_else(|| "Missing/invalid `quantity` value.".to_string())?;
            let price = match side {
                Side::Orders => order
                    .price
                    .ok_or_else(|| "Missing/invalid price value.".to_string())?,
                Side::Products => product_value(|p| p.price, "price")?,
            };
            quantity * price
        }
    };

    if !revenue.is_finite() {
        return Err("Non-finite revenue.".to_string());
    }
    Ok(revenue)
}
