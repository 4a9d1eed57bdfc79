//! Synthetic input generation.
//!
//! Customers are drawn from the same generative story the models assume:
//! - purchase rate λ ~ Gamma(r, α), drop-out probability p ~ Beta(a, b)
//! - inter-purchase gaps ~ Exp(λ); after each purchase the customer leaves with probability p
//! - spend per purchase ~ Gamma(p, ν) with ν ~ Gamma(q, v)
//!
//! The output is a set of `customers.csv`, `orders.csv` and `products.csv`
//! files that the `run` command can read back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Beta, Exp, Gamma, LogNormal};
use serde::Serialize;
use tracing::info;

use crate::aggregate::summarize_transactions;
use crate::domain::{BgNbdParams, CustomerSummary, GammaGammaParams, Transaction};
use crate::error::AppError;

/// Generator settings. Rates are per day.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub customers: usize,
    pub products: usize,
    /// Length of the observation window.
    pub days: u32,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub bgnbd: BgNbdParams,
    pub spend: GammaGammaParams,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            customers: 500,
            products: 40,
            days: 365,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            bgnbd: BgNbdParams {
                r: 0.6,
                alpha: 20.0,
                a: 0.8,
                b: 2.5,
            },
            spend: GammaGammaParams {
                p: 6.0,
                q: 4.0,
                v: 15.0,
            },
        }
    }
}

/// Paths written by [`write_sample`] plus row counts.
#[derive(Debug, Clone)]
pub struct SampleFiles {
    pub customers_path: PathBuf,
    pub orders_path: PathBuf,
    pub products_path: PathBuf,
    pub customers: usize,
    pub order_lines: usize,
    pub products: usize,
}

#[derive(Debug, Clone)]
struct SimulatedCustomer {
    id: usize,
    signup: NaiveDate,
    /// `(day offset, spend)` per purchase, in time order.
    purchases: Vec<(u32, f64)>,
}

#[derive(Debug, Serialize)]
struct CustomerCsvRow<'a> {
    customer_id: usize,
    signup_date: NaiveDate,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct ProductCsvRow {
    product_id: usize,
    product_name: String,
    category: &'static str,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct OrderCsvRow {
    order_id: usize,
    customer_id: usize,
    product_id: usize,
    order_date: String,
    quantity: u32,
}

const REGIONS: [&str; 4] = ["north", "south", "east", "west"];
const CATEGORIES: [&str; 5] = ["apparel", "books", "electronics", "garden", "grocery"];

/// Simulate purchase histories and summarize them at the end of the window.
///
/// Spend is taken as-is (no product/quantity rounding), so the summary
/// follows the model assumptions exactly.
pub fn simulate_customers(config: &SampleConfig) -> Result<Vec<CustomerSummary>, AppError> {
    validate(config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let customers = simulate_histories(config, &mut rng)?;

    let transactions: Vec<Transaction> = customers
        .iter()
        .flat_map(|c| {
            c.purchases.iter().enumerate().map(move |(k, &(day, spend))| Transaction {
                customer_id: c.id.to_string(),
                order_id: format!("{}-{k}", c.id),
                order_date: at_midnight(config.start_date + Duration::days(i64::from(day))),
                product_id: "sim".to_string(),
                revenue: spend,
            })
        })
        .collect();

    let end = at_midnight(config.start_date + Duration::days(i64::from(config.days)));
    Ok(summarize_transactions(&transactions, end))
}

/// Write a synthetic dataset into `dir` (created if missing).
pub fn write_sample(dir: &Path, config: &SampleConfig) -> Result<SampleFiles, AppError> {
    validate(config)?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", dir.display())))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let customers = simulate_histories(config, &mut rng)?;

    let price_dist = LogNormal::new(20.0_f64.ln(), 0.6).map_err(dist_err)?;
    let prices: Vec<f64> = (0..config.products)
        .map(|_| (price_dist.sample(&mut rng) * 100.0).round().max(1.0) / 100.0)
        .collect();

    let customers_path = dir.join("customers.csv");
    let products_path = dir.join("products.csv");
    let orders_path = dir.join("orders.csv");

    let mut w = csv_writer(&customers_path)?;
    for c in &customers {
        write_row(
            &mut w,
            &customers_path,
            &CustomerCsvRow {
                customer_id: c.id,
                signup_date: c.signup,
                region: REGIONS[c.id % REGIONS.len()],
            },
        )?;
    }
    flush(w, &customers_path)?;

    let mut w = csv_writer(&products_path)?;
    for (i, price) in prices.iter().enumerate() {
        write_row(
            &mut w,
            &products_path,
            &ProductCsvRow {
                product_id: i + 1,
                product_name: format!("Product {}", i + 1),
                category: CATEGORIES[i % CATEGORIES.len()],
                unit_price: *price,
            },
        )?;
    }
    flush(w, &products_path)?;

    let mut w = csv_writer(&orders_path)?;
    let mut order_id = 0usize;
    let mut order_lines = 0usize;
    for c in &customers {
        for &(day, spend) in &c.purchases {
            order_id += 1;
            let when = at_midnight(config.start_date + Duration::days(i64::from(day)))
                + Duration::minutes(rng.gen_range(8 * 60..22 * 60));
            let order_date = when.format("%Y-%m-%d %H:%M:%S").to_string();

            // Most orders are a single line; some add a one-off extra item.
            let lines = if rng.gen_bool(0.25) { 2 } else { 1 };
            for line in 0..lines {
                let product = rng.gen_range(0..prices.len());
                let quantity = if line == 0 {
                    ((spend / prices[product]).round() as u32).max(1)
                } else {
                    1
                };
                write_row(
                    &mut w,
                    &orders_path,
                    &OrderCsvRow {
                        order_id,
                        customer_id: c.id,
                        product_id: product + 1,
                        order_date: order_date.clone(),
                        quantity,
                    },
                )?;
                order_lines += 1;
            }
        }
    }
    flush(w, &orders_path)?;

    info!(
        customers = customers.len(),
        orders = order_id,
        order_lines,
        products = prices.len(),
        dir = %dir.display(),
        "sample written"
    );

    Ok(SampleFiles {
        customers_path,
        orders_path,
        products_path,
        customers: customers.len(),
        order_lines,
        products: prices.len(),
    })
}

fn validate(config: &SampleConfig) -> Result<(), AppError> {
    if config.customers == 0 {
        return Err(AppError::input("Sample customer count must be > 0."));
    }
    if config.products == 0 {
        return Err(AppError::input("Sample product count must be > 0."));
    }
    if config.days == 0 {
        return Err(AppError::input("Sample window must be at least one day."));
    }
    Ok(())
}

fn simulate_histories(config: &SampleConfig, rng: &mut StdRng) -> Result<Vec<SimulatedCustomer>, AppError> {
    let BgNbdParams { r, alpha, a, b } = config.bgnbd;
    let rate = Gamma::new(r, 1.0 / alpha).map_err(dist_err)?;
    let dropout = Beta::new(a, b).map_err(dist_err)?;
    let GammaGammaParams { p, q, v } = config.spend;
    let spend_scale = Gamma::new(q, 1.0 / v).map_err(dist_err)?;

    let window = f64::from(config.days);
    let mut out = Vec::with_capacity(config.customers);

    for id in 1..=config.customers {
        let lambda: f64 = rate.sample(rng);
        let p_drop: f64 = dropout.sample(rng);
        let nu: f64 = spend_scale.sample(rng);
        let spend = Gamma::new(p, 1.0 / nu).map_err(dist_err)?;
        let gap = if lambda > 0.0 && lambda.is_finite() {
            Some(Exp::new(lambda).map_err(dist_err)?)
        } else {
            None
        };

        let birth = rng.gen_range(0.0..window);
        let mut t = birth;
        let mut purchases = vec![(birth.floor() as u32, spend.sample(rng))];
        if let Some(gap) = gap {
            loop {
                if rng.gen_bool(p_drop.clamp(0.0, 1.0)) {
                    break;
                }
                t += gap.sample(rng);
                if t >= window {
                    break;
                }
                purchases.push((t.floor() as u32, spend.sample(rng)));
            }
        }

        out.push(SimulatedCustomer {
            id,
            signup: config.start_date + Duration::days(birth.floor() as i64),
            purchases,
        });
    }
    Ok(out)
}

fn dist_err(e: impl std::fmt::Display) -> AppError {
    AppError::input(format!("Invalid sample parameters: {e}"))
}

fn at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))
}

fn write_row<S: Serialize>(w: &mut csv::Writer<fs::File>, path: &Path, row: &S) -> Result<(), AppError> {
    w.serialize(row)
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))
}

fn flush(mut w: csv::Writer<fs::File>, path: &Path) -> Result<(), AppError> {
    w.flush()
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::{load_customers, load_orders, load_products};

    #[test]
    fn simulation_is_reproducible_for_a_seed() {
        let config = SampleConfig {
            customers: 50,
            ..SampleConfig::default()
        };
        let a = simulate_customers(&config).unwrap();
        let b = simulate_customers(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|c| c.recency <= c.t && c.t <= 365.0));
        assert!(a.iter().any(|c| c.frequency > 0));
    }

    #[test]
    fn written_sample_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = SampleConfig {
            customers: 30,
            products: 5,
            ..SampleConfig::default()
        };
        let files = write_sample(dir.path(), &config).unwrap();

        let customers = load_customers(&files.customers_path).unwrap();
        let orders = load_orders(&files.orders_path).unwrap();
        let products = load_products(&files.products_path).unwrap();

        assert_eq!(customers.rows.len(), 30);
        assert_eq!(products.rows.len(), 5);
        assert_eq!(orders.rows.len(), files.order_lines);
        assert!(orders.row_errors.is_empty());
        assert_eq!(
            products.columns.price_column.as_ref().map(|c| c.name.as_str()),
            Some("unit_price")
        );
        assert!(orders.columns.has_quantity);
    }

    #[test]
    fn empty_sample_is_rejected() {
        let config = SampleConfig {
            customers: 0,
            ..SampleConfig::default()
        };
        assert!(simulate_customers(&config).is_err());
    }
}
