// src/error.rs

use polars::prelude::PolarsError;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching or reshaping Census API data.
#[derive(Debug, Error)]
pub enum CensusError {
    /// The API answered with a non-success status.
    #[error("unexpected response from Census API: {status} for {url}")]
    Provider { url: String, status: StatusCode },

    /// The request never produced a response (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Per-year responses disagree on their column layout.
    #[error("column layout for {year} differs: expected {expected:?}, found {found:?}")]
    SchemaDrift {
        year: u16,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A many-to-one join found more than one row on the "one" side.
    #[error("join key {key} matches more than one metadata row")]
    JoinMultiplicity { key: String },

    /// A pivot found two values for the same output cell.
    #[error("pivot found more than one value for {key}")]
    DuplicatePivotEntry { key: String },

    #[error("at least one year is required")]
    NoYears,

    /// A geography level or survey version failed to parse.
    #[error("invalid {kind}: '{value}'")]
    InvalidArgument { kind: &'static str, value: String },

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// Reading or writing the on-disk response cache failed.
    #[error("response cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CensusError>;
