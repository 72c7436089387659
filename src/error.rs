use serde::Serialize;
use thiserror::Error;

/// Recoverable conditions reported to whoever presents the results.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub(crate) enum AnalysisError {
    #[error("No data available for the selected criteria.")]
    EmptyResult,

    #[error("cannot fit a trendline on '{x_column}': {reason}")]
    DegenerateRegression { x_column: String, reason: String },

    #[error("correlation is undefined for '{column}': the column has no variance")]
    UndefinedCorrelation { column: String },

    #[error("correlation between '{left}' and '{right}' is undefined: their shared rows have no variance")]
    UndefinedPairCorrelation { left: String, right: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid year range {min_year}..={max_year}")]
    InvalidYearRange { min_year: i32, max_year: i32 },
}

#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),
}
