use itertools::Itertools;
use log::debug;
use ndarray::{Array2, ArrayView1, Axis};
use ndarray_stats::CorrelationExt;
use serde::Serialize;

use crate::error::AnalysisError;
use crate::models::Table;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Coefficient {
    Value(f64),
    Undefined,
}

impl Coefficient {
    pub(crate) fn value(self) -> Option<f64> {
        match self {
            Coefficient::Value(v) => Some(v),
            Coefficient::Undefined => None,
        }
    }
}

/// Symmetric Pearson matrix; row and column labels are `columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CorrelationMatrix {
    pub(crate) columns: Vec<String>,
    pub(crate) cells: Vec<Vec<Coefficient>>,
}

impl CorrelationMatrix {
    #[cfg(test)]
    pub(crate) fn get(&self, a: &str, b: &str) -> Option<Coefficient> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.cells[i][j])
    }

    /// Columns whose diagonal entry is undefined (no variance).
    pub(crate) fn undefined_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.cells[*i][*i] == Coefficient::Undefined)
            .map(|(_, c)| c.as_str())
            .collect()
    }

    /// Pairs of columns that each have variance but whose shared rows do
    /// not, so their cell is undefined.
    pub(crate) fn undefined_pairs(&self) -> Vec<(&str, &str)> {
        let defined = |i: usize| self.cells[i][i] != Coefficient::Undefined;
        (0..self.len())
            .tuple_combinations()
            .filter(|&(i, j)| defined(i) && defined(j) && self.cells[i][j] == Coefficient::Undefined)
            .map(|(i, j)| (self.columns[i].as_str(), self.columns[j].as_str()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Pairwise-complete Pearson correlation between `columns` of `joined`.
pub(crate) fn correlate<S: AsRef<str>>(joined: &Table, columns: &[S]) -> Result<CorrelationMatrix, AnalysisError> {
    let indices = columns
        .iter()
        .map(|c| joined.require_column(c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    // observations x columns, NaN marks a missing cell
    let mut data = Array2::from_elem((joined.len(), indices.len()), f64::NAN);
    for (r, row) in joined.rows.iter().enumerate() {
        for (c, &idx) in indices.iter().enumerate() {
            if let Some(v) = row.values[idx] {
                data[(r, c)] = v;
            }
        }
    }

    let n = indices.len();
    let mut cells = vec![vec![Coefficient::Undefined; n]; n];
    for i in 0..n {
        let present: Vec<f64> = data.column(i).iter().copied().filter(|v| !v.is_nan()).collect();
        if has_variance(&present) {
            cells[i][i] = Coefficient::Value(1.0);
        }
    }
    for (i, j) in (0..n).tuple_combinations() {
        let coefficient = pairwise_pearson(data.column(i), data.column(j));
        cells[i][j] = coefficient;
        cells[j][i] = coefficient;
    }

    debug!("correlation over {} rows and {} columns", joined.len(), n);

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        cells,
    })
}

fn pairwise_pearson(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Coefficient {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .unzip();

    if !has_variance(&xs) || !has_variance(&ys) {
        return Coefficient::Undefined;
    }

    let n = xs.len();
    let mut pair = Array2::<f64>::zeros((2, n));
    pair.index_axis_mut(Axis(0), 0).assign(&ArrayView1::from(&xs[..]));
    pair.index_axis_mut(Axis(0), 1).assign(&ArrayView1::from(&ys[..]));

    match pair.pearson_correlation() {
        Ok(corr) if corr[(0, 1)].is_finite() => Coefficient::Value(corr[(0, 1)].clamp(-1.0, 1.0)),
        _ => Coefficient::Undefined,
    }
}

fn has_variance(values: &[f64]) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.iter().any(|v| v != first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, CEMENT_CO2, CO2_PER_CAPITA, CO2_SCHEMA, GDP, TRADE_CO2};

    fn table(rows: &[[Option<f64>; 4]]) -> Table {
        let mut table = Table::new(
            CO2_SCHEMA,
            vec![CO2_PER_CAPITA.into(), GDP.into(), CEMENT_CO2.into(), TRADE_CO2.into()],
        );
        for (i, values) in rows.iter().enumerate() {
            table.rows.push(Observation { entity: "France".into(), year: 2000 + i as i32, values: values.to_vec() });
        }
        table
    }

    const COLUMNS: [&str; 4] = [CO2_PER_CAPITA, GDP, CEMENT_CO2, TRADE_CO2];

    #[test]
    fn perfect_correlations() {
        let rows: Vec<_> = (1..=5)
            .map(|i| {
                let x = i as f64;
                [Some(x), Some(2.0 * x + 1.0), Some(-x), Some((x * 7.0) % 5.0)]
            })
            .collect();
        let matrix = correlate(&table(&rows), &COLUMNS).unwrap();

        let gdp = matrix.get(CO2_PER_CAPITA, GDP).unwrap().value().unwrap();
        assert!((gdp - 1.0).abs() < 1e-9, "got {}", gdp);
        let cement = matrix.get(CO2_PER_CAPITA, CEMENT_CO2).unwrap().value().unwrap();
        assert!((cement + 1.0).abs() < 1e-9, "got {}", cement);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let rows = [
            [Some(1.0), Some(3.0), Some(2.0), Some(9.0)],
            [Some(2.0), Some(1.0), Some(5.0), Some(4.0)],
            [Some(4.0), Some(8.0), None, Some(1.0)],
            [Some(3.0), None, Some(7.0), Some(6.0)],
            [Some(6.0), Some(2.0), Some(1.0), Some(3.0)],
        ];
        let matrix = correlate(&table(&rows), &COLUMNS).unwrap();

        assert_eq!(matrix.len(), 4);
        for a in COLUMNS {
            assert_eq!(matrix.get(a, a), Some(Coefficient::Value(1.0)));
            for b in COLUMNS {
                assert_eq!(matrix.get(a, b), matrix.get(b, a));
                let v = matrix.get(a, b).unwrap().value().unwrap();
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn pairwise_complete_rows_only() {
        // the third row would break the perfect correlation if it were used
        let rows = [
            [Some(1.0), Some(2.0), Some(1.0), Some(1.0)],
            [Some(2.0), Some(4.0), Some(2.0), Some(2.0)],
            [Some(100.0), None, Some(3.0), Some(3.0)],
            [Some(3.0), Some(6.0), Some(4.0), Some(5.0)],
        ];
        let matrix = correlate(&table(&rows), &COLUMNS).unwrap();
        let v = matrix.get(CO2_PER_CAPITA, GDP).unwrap().value().unwrap();
        assert!((v - 1.0).abs() < 1e-9, "got {}", v);
    }

    #[test]
    fn zero_variance_column_is_undefined() {
        let rows = [
            [Some(1.0), Some(5.0), Some(2.0), Some(1.0)],
            [Some(2.0), Some(5.0), Some(3.0), Some(4.0)],
            [Some(3.0), Some(5.0), Some(1.0), Some(2.0)],
        ];
        let matrix = correlate(&table(&rows), &COLUMNS).unwrap();

        assert_eq!(matrix.get(GDP, GDP), Some(Coefficient::Undefined));
        assert_eq!(matrix.get(GDP, CO2_PER_CAPITA), Some(Coefficient::Undefined));
        assert_eq!(matrix.undefined_columns(), vec![GDP]);
        assert_eq!(matrix.get(CO2_PER_CAPITA, CO2_PER_CAPITA), Some(Coefficient::Value(1.0)));
    }

    #[test]
    fn constant_shared_rows_leave_the_pair_undefined() {
        // gdp and cement_co2 both vary, but only overlap where gdp is 7
        let rows = [
            [Some(1.0), Some(1.0), None, Some(2.0)],
            [Some(2.0), Some(2.0), None, Some(1.0)],
            [Some(3.0), Some(7.0), Some(3.0), Some(4.0)],
            [Some(4.0), Some(7.0), Some(4.0), Some(3.0)],
        ];
        let matrix = correlate(&table(&rows), &COLUMNS).unwrap();

        assert_eq!(matrix.get(GDP, GDP), Some(Coefficient::Value(1.0)));
        assert_eq!(matrix.get(CEMENT_CO2, CEMENT_CO2), Some(Coefficient::Value(1.0)));
        assert_eq!(matrix.get(GDP, CEMENT_CO2), Some(Coefficient::Undefined));
        assert_eq!(matrix.get(CEMENT_CO2, GDP), Some(Coefficient::Undefined));
        assert!(matrix.undefined_columns().is_empty());
        assert_eq!(matrix.undefined_pairs(), vec![(GDP, CEMENT_CO2)]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let rows = [[Some(1.0), Some(1.0), Some(1.0), Some(1.0)]];
        let err = correlate(&table(&rows), &["methane"]).unwrap_err();
        assert_eq!(err, AnalysisError::UnknownColumn("methane".into()));
    }
}
