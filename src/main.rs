mod compare;
mod config;
mod correlation;
mod error;
mod filter;
mod join;
mod loader;
mod models;
mod pipeline;
mod render;

use std::fs;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use log::{info, warn};

use crate::config::Cli;
use crate::error::AnalysisError;
use crate::models::{FilterCriteria, CO2_SCHEMA, LIFE_EXPECTANCY_SCHEMA};
use crate::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;

    let life = loader::load_table_from_path(&cli.life_csv, LIFE_EXPECTANCY_SCHEMA)
        .with_context(|| format!("loading {}", cli.life_csv.display()))?;
    let co2 = loader::load_table_from_path(&cli.co2_csv, CO2_SCHEMA)
        .with_context(|| format!("loading {}", cli.co2_csv.display()))?;

    let criteria = FilterCriteria::new(cli.countries.iter().cloned(), (cli.from, cli.to))?;
    let available: Vec<String> = co2
        .numeric_columns()
        .into_iter()
        .chain(life.numeric_columns())
        .map(String::from)
        .collect();
    let pipeline = Pipeline::new(co2, life, config);
    let (min_year, max_year) = criteria.year_range();
    info!(
        "comparing '{}' against '{}' for {} countries in {}..={}",
        pipeline.config().x_axis(),
        pipeline.config().y_axis_variable,
        criteria.selected_entities.len(),
        min_year,
        max_year
    );

    let model = match pipeline.handle_request(&criteria) {
        Ok(model) => model,
        Err(AnalysisError::EmptyResult) => {
            warn!("{}", AnalysisError::EmptyResult);
            println!("{}", AnalysisError::EmptyResult);
            return Ok(());
        }
        Err(AnalysisError::UnknownColumn(column)) => {
            bail!("unknown column '{}', available columns: {}", column, available.join(", "));
        }
        Err(err) => return Err(err.into()),
    };

    fs::create_dir_all(&cli.out_dir).with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let comparison_file = cli.out_dir.join("comparison.png");
    match render::comparison_bounds(&model) {
        Some(bounds) => {
            render::draw_comparison(&model, bounds, &comparison_file)
                .map_err(|e| anyhow!("drawing comparison chart: {e}"))?;
            info!("comparison chart saved to {}", comparison_file.display());
        }
        None => warn!("no complete {} / {} pairs to plot, skipping the comparison chart", model.x_axis_variable, model.y_axis_variable),
    }

    let heatmap_file = cli.out_dir.join("correlation.png");
    render::draw_heatmap(&model.correlation, &heatmap_file).map_err(|e| anyhow!("drawing heatmap: {e}"))?;
    info!("heatmap saved to {}", heatmap_file.display());

    let json_file = cli.out_dir.join("render_model.json");
    fs::write(&json_file, serde_json::to_string_pretty(&model)?)
        .with_context(|| format!("writing {}", json_file.display()))?;
    info!("render model saved to {}", json_file.display());

    println!("{}: {} joined rows", model.page_title, model.joined_rows);
    for trendline in &model.trendlines {
        println!(
            "{}: slope {:.4}, intercept {:.4}, r² {:.3} over {} rows",
            trendline.label, trendline.fit.slope, trendline.fit.intercept, trendline.fit.r_squared, trendline.fit.observations
        );
    }
    for warning in &model.warnings {
        println!("warning: {warning}");
    }

    Ok(())
}
