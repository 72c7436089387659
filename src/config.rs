use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::models::{CO2_PER_CAPITA, DEFAULT_CORRELATION_COLUMNS, LIFE_EXPECTANCY};

/// Whether one trendline is fitted over all selected countries or one per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum TrendlineScope {
    #[default]
    Pooled,
    PerEntity,
}

/// The two page layouts: life expectancy fixed on the x axis, or a
/// caller-selected metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum PageVariant {
    SingleMetric,
    #[default]
    CompareMetrics,
}

impl PageVariant {
    pub(crate) fn trendline_label(self) -> &'static str {
        match self {
            PageVariant::SingleMetric => "Average OLS Trendline",
            PageVariant::CompareMetrics => "OLS Trendline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PipelineConfig {
    pub(crate) x_axis_variable: String,
    pub(crate) y_axis_variable: String,
    pub(crate) correlation_columns: Vec<String>,
    pub(crate) trendline_scope: TrendlineScope,
    pub(crate) variant: PageVariant,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            x_axis_variable: LIFE_EXPECTANCY.to_string(),
            y_axis_variable: CO2_PER_CAPITA.to_string(),
            correlation_columns: DEFAULT_CORRELATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
            trendline_scope: TrendlineScope::default(),
            variant: PageVariant::default(),
        }
    }
}

impl PipelineConfig {
    pub(crate) fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The single-metric page always plots life expectancy on the x axis.
    pub(crate) fn x_axis(&self) -> &str {
        match self.variant {
            PageVariant::SingleMetric => LIFE_EXPECTANCY,
            PageVariant::CompareMetrics => &self.x_axis_variable,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "co2-life-trends", about = "Compare life expectancy and CO2 metrics by country")]
pub(crate) struct Cli {
    #[arg(long, default_value = "data/life-expectancy.csv")]
    pub(crate) life_csv: PathBuf,

    #[arg(long, default_value = "data/owid-co2-data.csv")]
    pub(crate) co2_csv: PathBuf,

    /// Country to include; repeat for several.
    #[arg(long = "country", required = true)]
    pub(crate) countries: Vec<String>,

    #[arg(long, default_value_t = 1990)]
    pub(crate) from: i32,

    #[arg(long, default_value_t = 2020)]
    pub(crate) to: i32,

    #[arg(long)]
    pub(crate) x_axis: Option<String>,

    #[arg(long)]
    pub(crate) y_axis: Option<String>,

    #[arg(long, value_enum)]
    pub(crate) scope: Option<TrendlineScope>,

    #[arg(long, value_enum)]
    pub(crate) variant: Option<PageVariant>,

    /// TOML file with pipeline defaults; flags take precedence.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    #[arg(long, default_value = "out")]
    pub(crate) out_dir: PathBuf,
}

impl Cli {
    pub(crate) fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(x) = &self.x_axis {
            config.x_axis_variable = x.clone();
        }
        if let Some(y) = &self.y_axis {
            config.y_axis_variable = y.clone();
        }
        if let Some(scope) = self.scope {
            config.trendline_scope = scope;
        }
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            x_axis_variable = "gdp"
            trendline_scope = "per-entity"
            "#,
        )
        .unwrap();

        assert_eq!(config.x_axis_variable, "gdp");
        assert_eq!(config.y_axis_variable, CO2_PER_CAPITA);
        assert_eq!(config.trendline_scope, TrendlineScope::PerEntity);
        assert_eq!(config.correlation_columns.len(), 4);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "co2-life-trends",
            "--country",
            "France",
            "--country",
            "Germany",
            "--x-axis",
            "gdp",
            "--scope",
            "per-entity",
        ]);
        let config = cli.pipeline_config().unwrap();

        assert_eq!(cli.countries, vec!["France".to_string(), "Germany".to_string()]);
        assert_eq!((cli.from, cli.to), (1990, 2020));
        assert_eq!(config.x_axis(), "gdp");
        assert_eq!(config.trendline_scope, TrendlineScope::PerEntity);
    }

    #[test]
    fn single_metric_variant_pins_life_expectancy() {
        let config = PipelineConfig {
            x_axis_variable: "gdp".into(),
            variant: PageVariant::SingleMetric,
            ..PipelineConfig::default()
        };
        assert_eq!(config.x_axis(), LIFE_EXPECTANCY);
        assert_eq!(config.variant.trendline_label(), "Average OLS Trendline");
    }
}
