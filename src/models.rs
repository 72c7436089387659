use itertools::Itertools;
use serde::Serialize;

use crate::error::AnalysisError;

pub(crate) const LIFE_EXPECTANCY: &str = "Life expectancy";
pub(crate) const CO2_PER_CAPITA: &str = "co2_per_capita";
pub(crate) const GDP: &str = "gdp";
pub(crate) const CEMENT_CO2: &str = "cement_co2";
pub(crate) const TRADE_CO2: &str = "trade_co2";

pub(crate) const DEFAULT_CORRELATION_COLUMNS: [&str; 4] = [CO2_PER_CAPITA, GDP, CEMENT_CO2, TRADE_CO2];

/// Names of the key columns of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableSchema {
    pub(crate) entity: &'static str,
    pub(crate) year: &'static str,
}

pub(crate) const LIFE_EXPECTANCY_SCHEMA: TableSchema = TableSchema { entity: "Entity", year: "Year" };
pub(crate) const CO2_SCHEMA: TableSchema = TableSchema { entity: "country", year: "year" };

/// One row of a table, keyed by (entity, year). `values` is aligned with
/// the owning table's `columns`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Observation {
    pub(crate) entity: String,
    pub(crate) year: i32,
    pub(crate) values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Table {
    pub(crate) schema: TableSchema,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Observation>,
}

impl Table {
    pub(crate) fn new(schema: TableSchema, columns: Vec<String>) -> Self {
        Table { schema, columns, rows: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Same as [`Table::column_index`] but unknown names are an error.
    pub(crate) fn require_column(&self, name: &str) -> Result<usize, AnalysisError> {
        self.column_index(name).ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))
    }

    /// Columns holding at least one present value.
    pub(crate) fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.rows.iter().any(|row| row.values[*i].is_some()))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> std::collections::BTreeSet<(String, i32)> {
        self.rows.iter().map(|row| (row.entity.clone(), row.year)).collect()
    }
}

/// Entities and inclusive year interval picked by the user. Entities keep
/// the order they were given in, without repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilterCriteria {
    pub(crate) selected_entities: Vec<String>,
    min_year: i32,
    max_year: i32,
}

impl FilterCriteria {
    pub(crate) fn new<I, S>(entities: I, year_range: (i32, i32)) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (min_year, max_year) = year_range;
        if min_year > max_year {
            return Err(AnalysisError::InvalidYearRange { min_year, max_year });
        }
        Ok(FilterCriteria {
            selected_entities: entities.into_iter().map(Into::<String>::into).unique().collect(),
            min_year,
            max_year,
        })
    }

    pub(crate) fn year_range(&self) -> (i32, i32) {
        (self.min_year, self.max_year)
    }

    pub(crate) fn matches(&self, entity: &str, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year) && self.selected_entities.iter().any(|e| e == entity)
    }
}

/// Fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TrendlineResult {
    pub(crate) x_values: Vec<f64>,
    pub(crate) fitted_values: Vec<f64>,
    pub(crate) slope: f64,
    pub(crate) intercept: f64,
    pub(crate) r_squared: f64,
    pub(crate) observations: usize,
}

/// Human readable name for a column, used in chart titles.
pub(crate) fn display_name(column: &str) -> String {
    match column {
        LIFE_EXPECTANCY => "Life Expectancy".to_string(),
        CO2_PER_CAPITA => "CO2 Per Capita".to_string(),
        GDP => "GDP".to_string(),
        CEMENT_CO2 => "Cement CO2".to_string(),
        TRADE_CO2 => "Trade CO2".to_string(),
        other => other.replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_year_range_is_rejected() {
        let err = FilterCriteria::new(["France"], (2010, 2000)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidYearRange { min_year: 2010, max_year: 2000 }));
    }

    #[test]
    fn criteria_bounds_are_inclusive() {
        let criteria = FilterCriteria::new(["France"], (2000, 2010)).unwrap();
        assert!(criteria.matches("France", 2000));
        assert!(criteria.matches("France", 2010));
        assert!(!criteria.matches("France", 2011));
        assert!(!criteria.matches("Germany", 2005));
    }

    #[test]
    fn entities_keep_caller_order_without_repeats() {
        let criteria = FilterCriteria::new(["Germany", "France", "Germany"], (2000, 2010)).unwrap();
        assert_eq!(criteria.selected_entities, vec!["Germany".to_string(), "France".to_string()]);
    }

    #[test]
    fn numeric_columns_skip_empty_ones() {
        let mut table = Table::new(CO2_SCHEMA, vec!["iso_code".into(), GDP.into()]);
        table.rows.push(Observation { entity: "France".into(), year: 2000, values: vec![None, Some(1.0)] });
        assert_eq!(table.numeric_columns(), vec![GDP]);
    }
}
