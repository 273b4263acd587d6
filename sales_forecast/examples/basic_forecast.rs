use chrono::{Duration, NaiveDate};
use sales_forecast::models::{default_models, ModelOptions};
use sales_forecast::pipeline::backtest;
use sales_forecast::utils::train_test_split;
use sales_forecast::{select_best, ModelScore, Pipeline, PipelineConfig, RawRecord};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sales Forecast: Basic Forecast Example");
    println!("======================================\n");

    // Two stores reporting every day for 120 days
    let records = create_sample_records(120)?;
    println!("Created {} raw records\n", records.len());

    let output_dir = std::env::temp_dir().join("sales_forecast_example");
    std::fs::create_dir_all(&output_dir)?;

    let config = PipelineConfig {
        series_output_path: output_dir.join("cleaned_daily_sales.csv"),
        forecast_output_path: output_dir.join("forecast_units_sold.csv"),
        model_output_path: Some(output_dir.join("model.json")),
        ..PipelineConfig::default()
    };

    // Score each model by hand first
    let series = sales_forecast::SeriesBuilder::new(config.horizon).build(&records)?;
    let split = train_test_split(&series, config.horizon)?;
    let mut scores = Vec::new();
    for model in default_models(&ModelOptions::default()) {
        match backtest(model.as_ref(), &split) {
            Ok(metrics) => {
                println!("{}:\n{}", model.kind(), metrics);
                scores.push(ModelScore::new(model.kind(), metrics.rmse));
            }
            Err(e) => println!("{} failed: {}\n", model.kind(), e),
        }
    }
    if let Some(best) = select_best(&scores) {
        println!("Best model by RMSE: {}\n", best);
    }

    // Then run the whole pipeline
    let report = Pipeline::new(config)?.run_on_records(&records)?;
    println!("{}", report);

    for point in report.forecast.points().iter().take(7) {
        println!(
            "{}  {:>8.2}  [{:>8.2}, {:>8.2}]",
            point.date, point.predicted, point.lower, point.upper
        );
    }

    Ok(())
}

fn create_sample_records(days: i64) -> Result<Vec<RawRecord>, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).ok_or("invalid start date")?;
    let weekly = [0.0, -4.0, -2.0, 1.0, 3.0, 12.0, 9.0];

    let records = (0..days)
        .flat_map(|i| {
            let date = (start + Duration::days(i)).format("%Y-%m-%d").to_string();
            let level = 120.0 + 0.3 * i as f64 + weekly[(i % 7) as usize];
            let noise = ((i * 37 % 11) as f64 - 5.0) * 0.8;
            vec![
                RawRecord::new(date.clone(), Some(level + noise)),
                RawRecord::new(date, Some(level - noise)),
            ]
        })
        .collect();
    Ok(records)
}
