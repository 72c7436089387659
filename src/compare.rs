use std::collections::{BTreeSet, HashMap};

use log::debug;
use ordered_float::NotNan;
use statrs::statistics::Statistics;

use crate::error::AnalysisError;
use crate::models::{Table, TrendlineResult};

/// (entity, points) in the order the entities were selected.
pub(crate) type EntityPoints = Vec<(String, Vec<(f64, f64)>)>;

/// Per-entity point series plus the pooled trendline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MetricComparison {
    pub(crate) per_entity_series: EntityPoints,
    pub(crate) trendline: TrendlineResult,
}

pub(crate) fn compare(
    joined: &Table,
    x_column: &str,
    y_column: &str,
    entities: &[String],
) -> Result<MetricComparison, AnalysisError> {
    let per_entity_series = entity_series(joined, x_column, y_column, entities)?;
    let trendline = fit_trendline(joined, x_column, y_column)?;
    Ok(MetricComparison { per_entity_series, trendline })
}

/// (x, y) pairs for each requested entity in table order, entities in the
/// order given. Rows missing either value are left out; entities without
/// rows get an empty series.
pub(crate) fn entity_series(
    joined: &Table,
    x_column: &str,
    y_column: &str,
    entities: &[String],
) -> Result<EntityPoints, AnalysisError> {
    let xi = joined.require_column(x_column)?;
    let yi = joined.require_column(y_column)?;

    let slot: HashMap<&str, usize> = entities.iter().enumerate().map(|(i, e)| (e.as_str(), i)).collect();
    let mut series: EntityPoints = entities.iter().map(|e| (e.clone(), Vec::new())).collect();
    for row in &joined.rows {
        let Some(&i) = slot.get(row.entity.as_str()) else {
            continue;
        };
        if let (Some(x), Some(y)) = (row.values[xi], row.values[yi]) {
            series[i].1.push((x, y));
        }
    }
    Ok(series)
}

/// Pooled OLS fit of `y ~ 1 + x` over every complete row of `joined`.
pub(crate) fn fit_trendline(joined: &Table, x_column: &str, y_column: &str) -> Result<TrendlineResult, AnalysisError> {
    let xi = joined.require_column(x_column)?;
    let yi = joined.require_column(y_column)?;

    let (x, y): (Vec<f64>, Vec<f64>) = joined
        .rows
        .iter()
        .filter_map(|row| Some((row.values[xi]?, row.values[yi]?)))
        .unzip();

    ordinary_least_squares(&x, &y).map_err(|reason| AnalysisError::DegenerateRegression {
        x_column: x_column.to_string(),
        reason,
    })
}

/// One fit per entity, for the per-entity trendline scope. Entities without
/// points are skipped; entities whose fit is degenerate come back as errors
/// next to the others.
pub(crate) fn fit_entity_trendlines(
    joined: &Table,
    x_column: &str,
    y_column: &str,
    entities: &[String],
) -> Result<Vec<(String, Result<TrendlineResult, AnalysisError>)>, AnalysisError> {
    let series = entity_series(joined, x_column, y_column, entities)?;
    Ok(series
        .into_iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(entity, points)| {
            let (x, y): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
            let fit = ordinary_least_squares(&x, &y).map_err(|reason| AnalysisError::DegenerateRegression {
                x_column: x_column.to_string(),
                reason: format!("{entity}: {reason}"),
            });
            (entity, fit)
        })
        .collect())
}

/// Closed form single-predictor OLS. `Err` carries the reason the fit is
/// undefined.
fn ordinary_least_squares(x: &[f64], y: &[f64]) -> Result<TrendlineResult, String> {
    let distinct: BTreeSet<NotNan<f64>> = x.iter().filter_map(|&v| NotNan::new(v).ok()).collect();
    if distinct.len() < 2 {
        return Err(format!(
            "need at least 2 distinct values, got {} across {} rows",
            distinct.len(),
            x.len()
        ));
    }

    let x_var = x.variance();
    if !x_var.is_finite() || x_var <= 0.0 {
        return Err("independent variable has no variance".to_string());
    }

    let slope = x.covariance(y) / x_var;
    let intercept = y.mean() - slope * x.mean();
    if !slope.is_finite() || !intercept.is_finite() {
        return Err("fit produced non-finite coefficients".to_string());
    }

    let fitted_values: Vec<f64> = x.iter().map(|&xv| intercept + slope * xv).collect();

    let y_mean = y.mean();
    let total: f64 = y.iter().map(|&yv| (yv - y_mean).powi(2)).sum();
    let residual: f64 = y.iter().zip(&fitted_values).map(|(&yv, &fv)| (yv - fv).powi(2)).sum();
    let r_squared = if total > 0.0 { 1.0 - residual / total } else { 1.0 };

    debug!("ols over {} rows: slope={:.6} intercept={:.6} r2={:.4}", x.len(), slope, intercept, r_squared);

    Ok(TrendlineResult {
        x_values: x.to_vec(),
        fitted_values,
        slope,
        intercept,
        r_squared,
        observations: x.len(),
    })
}
