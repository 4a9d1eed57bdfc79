use std::fs;
use std::path::Path;

use clv_forecast::app::pipeline::{run_pipeline, write_outputs};
use clv_forecast::data::{write_sample, SampleConfig};
use clv_forecast::domain::{ClvSettings, RevenueSource, RunConfig};
use clv_forecast::error::{EXIT_DATA, EXIT_INPUT};
use clv_forecast::io::{read_clv_summary, read_model_json};

fn config_for(data: &Path, out: &Path) -> RunConfig {
    RunConfig {
        customers_path: data.join("customers.csv"),
        orders_path: data.join("orders.csv"),
        products_path: data.join("products.csv"),
        output_dir: out.to_path_buf(),
        bgnbd_penalizer: 0.001,
        gamma_gamma_penalizer: 0.01,
        clv: ClvSettings::default(),
        bins: 50,
        top_n: 10,
        sample_rows: 5,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        charts: true,
        export_model: Some(out.join("models").join("model.json")),
    }
}

#[test]
fn synthetic_dataset_runs_end_to_end() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let sample = SampleConfig {
        customers: 300,
        products: 12,
        ..SampleConfig::default()
    };
    let files = write_sample(data.path(), &sample).unwrap();

    let config = config_for(data.path(), out.path());
    let run = run_pipeline(&config).unwrap();

    assert_eq!(run.shapes.customers.rows, 300);
    assert_eq!(run.shapes.orders.rows, files.order_lines);
    assert_eq!(run.shapes.products.rows, 12);
    assert_eq!(
        run.revenue_source,
        RevenueSource::Derived {
            price_column: "unit_price".to_string()
        }
    );
    assert!(run.row_errors.is_empty());
    assert_eq!(run.rfm.len(), 300);
    assert_eq!(run.summary.len(), 300);
    assert_eq!(run.clv.len(), 300);
    assert!(run.gamma_gamma.params.q > 1.0);
    assert!(run.clv.iter().all(|r| r.clv.is_finite() && r.clv >= 0.0));
    assert!(run.clv.iter().all(|r| (0.0..=1.0).contains(&r.p_alive)));

    let saved = write_outputs(&config, &run).unwrap();
    let back = read_clv_summary(&saved.summary_csv).unwrap();
    assert_eq!(back.len(), run.clv.len());
    assert_eq!(back[0].customer_id, run.clv[0].customer_id);

    let header = fs::read_to_string(&saved.summary_csv).unwrap();
    assert!(header.starts_with("customer_id,frequency,recency,T,monetary_value,clv,p_alive,expected_purchases\n"));

    let charts = saved.charts.unwrap();
    assert!(charts.clv_distribution.exists());
    assert!(charts.revenue_per_product.exists());
    assert!(charts.order_revenue_distribution.exists());

    assert_eq!(saved.model_json.as_deref(), Some(out.path().join("models").join("model.json").as_path()));
    let model = read_model_json(&out.path().join("models").join("model.json")).unwrap();
    assert_eq!(model.bgnbd, run.bgnbd.params);
    assert_eq!(model.gamma_gamma, run.gamma_gamma.params);
    assert_eq!(model.snapshot_date, run.snapshot.date());
}

#[test]
fn default_penalizers_yield_clv_across_seeds() {
    for (seed, customers) in [(1, 300), (7, 500), (99, 2000)] {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let sample = SampleConfig {
            customers,
            seed,
            ..SampleConfig::default()
        };
        write_sample(data.path(), &sample).unwrap();

        let config = RunConfig {
            charts: false,
            export_model: None,
            ..config_for(data.path(), out.path())
        };
        let run = run_pipeline(&config).unwrap();
        assert!(run.gamma_gamma.params.q > 1.0, "seed {seed}: q = {}", run.gamma_gamma.params.q);
        assert!(run.clv.iter().all(|r| r.clv.is_finite()), "seed {seed}");
    }
}

#[test]
fn existing_revenue_column_is_used_as_is() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let sample = SampleConfig {
        customers: 200,
        products: 8,
        seed: 7,
        ..SampleConfig::default()
    };
    write_sample(data.path(), &sample).unwrap();

    // Replace the products' price column with a plain revenue column.
    let products = fs::read_to_string(data.path().join("products.csv")).unwrap();
    let products = products.replacen("unit_price", "revenue", 1);
    fs::write(data.path().join("products.csv"), products).unwrap();

    let config = RunConfig {
        charts: false,
        export_model: None,
        ..config_for(data.path(), out.path())
    };
    let run = run_pipeline(&config).unwrap();
    assert_eq!(run.revenue_source, RevenueSource::Column);
    assert!(run.order_revenue.iter().all(|r| *r > 0.0));
}

#[test]
fn missing_price_column_is_an_input_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(data.path().join("customers.csv"), "customer_id\n1\n2\n").unwrap();
    fs::write(
        data.path().join("orders.csv"),
        "order_id,customer_id,product_id,order_date,quantity\n1,1,10,2024-01-01,2\n2,2,10,2024-01-05,1\n",
    )
    .unwrap();
    fs::write(data.path().join("products.csv"), "product_id,name\n10,Widget\n").unwrap();

    let err = run_pipeline(&config_for(data.path(), out.path())).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_INPUT);
    assert!(err.message().contains("No price column found in orders/products after merge!"));
}

#[test]
fn one_time_buyers_only_is_a_data_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(data.path().join("customers.csv"), "customer_id\n1\n2\n").unwrap();
    fs::write(
        data.path().join("orders.csv"),
        "order_id,customer_id,product_id,order_date,quantity\n1,1,10,2024-01-01,2\n2,2,10,2024-01-05,1\n",
    )
    .unwrap();
    fs::write(data.path().join("products.csv"), "product_id,price\n10,4.5\n").unwrap();

    let err = run_pipeline(&config_for(data.path(), out.path())).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_DATA);
}
