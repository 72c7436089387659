use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, warn};

use crate::error::LoadError;
use crate::models::{Observation, Table, TableSchema};

pub(crate) fn load_table_from_path(path: &Path, schema: TableSchema) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io { path: path.display().to_string(), source })?;
    let table = load_table(file, schema)?;
    debug!("loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Read a CSV source. The schema's key columns are required, every other
/// column becomes a value column parsed as `f64`.
pub(crate) fn load_table<R: Read>(reader: R, schema: TableSchema) -> Result<Table, LoadError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let entity_column = position(schema.entity)?;
    let year_column = position(schema.year)?;

    let value_columns: Vec<usize> = (0..headers.len())
        .filter(|&i| i != entity_column && i != year_column)
        .collect();
    let mut table = Table::new(schema, value_columns.iter().map(|&i| headers[i].to_string()).collect());

    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let entity = record.get(entity_column).unwrap_or("").to_string();
        let Some(year) = record.get(year_column).and_then(coerce_year) else {
            skipped += 1;
            continue;
        };

        let values = value_columns
            .iter()
            .map(|&i| record.get(i).and_then(parse_value))
            .collect();
        table.rows.push(Observation { entity, year, values });
    }

    if skipped > 0 {
        warn!("skipped {} rows with a non-integer '{}' value", skipped, schema.year);
    }
    Ok(table)
}

/// Accepts "2005", " 2005 " and "2005.0"; rejects fractional years.
pub(crate) fn coerce_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}
