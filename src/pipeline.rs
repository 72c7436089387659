//! One pass of the analysis for one user request:
//!
//! ```text
//!  co2 table ──filter──┐
//!                      ├── inner join ──┬── metric comparison ──┐
//!  life table ─filter──┘                └── correlation ────────┴── RenderModel
//! ```

use log::{debug, warn};
use serde::Serialize;

use crate::compare::{compare, entity_series, fit_entity_trendlines, MetricComparison};
use crate::config::{PipelineConfig, TrendlineScope};
use crate::correlation::{correlate, CorrelationMatrix};
use crate::error::AnalysisError;
use crate::filter::filter;
use crate::join::inner_join;
use crate::models::{display_name, FilterCriteria, Table, TrendlineResult};

pub(crate) const PAGE_TITLE: &str = "Trend Analysis";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct EntitySeries {
    pub(crate) entity: String,
    pub(crate) label: String,
    pub(crate) points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TrendlineSeries {
    pub(crate) label: String,
    pub(crate) fit: TrendlineResult,
}

/// Everything the renderer needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RenderModel {
    pub(crate) page_title: String,
    pub(crate) chart_title: String,
    pub(crate) x_axis_title: String,
    pub(crate) y_axis_title: String,
    pub(crate) x_axis_variable: String,
    pub(crate) y_axis_variable: String,
    pub(crate) joined_rows: usize,
    pub(crate) entity_series: Vec<EntitySeries>,
    pub(crate) trendlines: Vec<TrendlineSeries>,
    pub(crate) correlation: CorrelationMatrix,
    /// Degenerate fits and undefined correlations; the rest of the model
    /// is still usable.
    pub(crate) warnings: Vec<AnalysisError>,
}

/// Holds the loaded tables; every request borrows them.
pub(crate) struct Pipeline {
    co2: Table,
    life: Table,
    config: PipelineConfig,
}

impl Pipeline {
    pub(crate) fn new(co2: Table, life: Table, config: PipelineConfig) -> Self {
        Pipeline { co2, life, config }
    }

    pub(crate) fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs filter, join, comparison and correlation. Only an empty join or
    /// a bad column name fails the request.
    pub(crate) fn handle_request(&self, criteria: &FilterCriteria) -> Result<RenderModel, AnalysisError> {
        let co2 = filter(&self.co2, criteria);
        let life = filter(&self.life, criteria);
        let joined = inner_join(&co2, &life)?;

        let x_column = self.config.x_axis();
        let y_column = self.config.y_axis_variable.as_str();
        let entities = &criteria.selected_entities;

        // a degenerate pooled fit still leaves the per-entity series to show
        let (per_entity, pooled) = match compare(&joined, x_column, y_column, entities) {
            Ok(MetricComparison { per_entity_series, trendline }) => (per_entity_series, Ok(trendline)),
            Err(err @ AnalysisError::DegenerateRegression { .. }) => {
                (entity_series(&joined, x_column, y_column, entities)?, Err(err))
            }
            Err(err) => return Err(err),
        };

        let series: Vec<EntitySeries> = per_entity
            .into_iter()
            .map(|(entity, points)| EntitySeries {
                label: format!("{entity} {x_column} vs {y_column}"),
                entity,
                points,
            })
            .collect();

        let mut warnings = Vec::new();
        let mut trendlines = Vec::new();
        match self.config.trendline_scope {
            TrendlineScope::Pooled => match pooled {
                Ok(fit) => trendlines.push(TrendlineSeries {
                    label: self.config.variant.trendline_label().to_string(),
                    fit,
                }),
                Err(err) => warnings.push(err),
            },
            TrendlineScope::PerEntity => {
                for (entity, fit) in fit_entity_trendlines(&joined, x_column, y_column, entities)? {
                    match fit {
                        Ok(fit) => trendlines.push(TrendlineSeries { label: format!("{entity} OLS Trendline"), fit }),
                        Err(err) => warnings.push(err),
                    }
                }
            }
        }

        let correlation = correlate(&joined, &self.config.correlation_columns)?;
        warnings.extend(
            correlation
                .undefined_columns()
                .into_iter()
                .map(|column| AnalysisError::UndefinedCorrelation { column: column.to_string() }),
        );
        warnings.extend(correlation.undefined_pairs().into_iter().map(|(left, right)| {
            AnalysisError::UndefinedPairCorrelation { left: left.to_string(), right: right.to_string() }
        }));

        for warning in &warnings {
            warn!("{warning}");
        }
        debug!(
            "request for {} entities produced {} series and {} trendlines",
            entities.len(),
            series.len(),
            trendlines.len()
        );

        let x_axis_title = display_name(x_column);
        let y_axis_title = display_name(y_column);
        Ok(RenderModel {
            page_title: PAGE_TITLE.to_string(),
            chart_title: format!("{x_axis_title} vs {y_axis_title}"),
            x_axis_title,
            y_axis_title,
            x_axis_variable: x_column.to_string(),
            y_axis_variable: y_column.to_string(),
            joined_rows: joined.len(),
            entity_series: series,
            trendlines,
            correlation,
            warnings,
        })
    }
}
