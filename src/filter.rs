use log::debug;

use crate::models::{FilterCriteria, Table};

/// Keep the rows whose entity is selected and whose year is in range.
/// Row order is preserved; an empty table is a normal result.
pub(crate) fn filter(table: &Table, criteria: &FilterCriteria) -> Table {
    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| criteria.matches(&row.entity, row.year))
        .cloned()
        .collect();

    debug!(
        "filter on '{}': kept {} of {} rows",
        table.schema.entity,
        rows.len(),
        table.len()
    );

    Table { schema: table.schema, columns: table.columns.clone(), rows }
}
