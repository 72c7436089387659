use std::collections::HashMap;

use log::debug;

use crate::error::AnalysisError;
use crate::models::{Observation, Table};

/// Inner join on (entity, year). Output follows the left table's row order
/// and keeps the left table's key column names. Value columns present on
/// both sides are suffixed `_x` (left) and `_y` (right).
pub(crate) fn inner_join(left: &Table, right: &Table) -> Result<Table, AnalysisError> {
    let mut index: HashMap<(&str, i32), Vec<&Observation>> = HashMap::new();
    for row in &right.rows {
        index.entry((row.entity.as_str(), row.year)).or_default().push(row);
    }

    let mut joined = Table::new(left.schema, joined_columns(left, right));
    for row in &left.rows {
        let Some(matches) = index.get(&(row.entity.as_str(), row.year)) else {
            continue;
        };
        for other in matches {
            let mut values = Vec::with_capacity(row.values.len() + other.values.len());
            values.extend_from_slice(&row.values);
            values.extend_from_slice(&other.values);
            joined.rows.push(Observation { entity: row.entity.clone(), year: row.year, values });
        }
    }

    debug!(
        "joined {} x {} rows into {} rows",
        left.len(),
        right.len(),
        joined.len()
    );

    if joined.is_empty() {
        return Err(AnalysisError::EmptyResult);
    }
    Ok(joined)
}

fn joined_columns(left: &Table, right: &Table) -> Vec<String> {
    let rename = |name: &String, other: &Table, suffix: &str| {
        if other.column_index(name).is_some() {
            format!("{name}{suffix}")
        } else {
            name.clone()
        }
    };

    left.columns
        .iter()
        .map(|c| rename(c, right, "_x"))
        .chain(right.columns.iter().map(|c| rename(c, left, "_y")))
        .collect()
}
