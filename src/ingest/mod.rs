//! Data source boundary.
//!
//! The core never talks HTTP directly; it consumes a `DataSource`. The
//! `airlens` submodule provides the HTTP implementation and the wire-format
//! parsing shared by every source.

pub mod airlens;

use std::fmt;

use crate::model::{Measurement, Metric, RecordError};

/// Queries the core needs from a measurement provider.
pub trait DataSource {
    /// All current measurements for `metric`.
    fn fetch_measurements(&self, metric: Metric) -> Result<Vec<Measurement>, SourceError>;

    /// The `top_n` most polluted entries for `metric`, most polluted first.
    fn fetch_ranked(&self, metric: Metric, top_n: usize) -> Result<Vec<Measurement>, SourceError>;

    /// The measurement nearest to the named city. A miss is
    /// `SourceError::NotFound`, never an empty success.
    fn search_city(&self, city: &str, metric: Metric) -> Result<Measurement, SourceError>;
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn fetch_measurements(&self, metric: Metric) -> Result<Vec<Measurement>, SourceError> {
        (**self).fetch_measurements(metric)
    }

    fn fetch_ranked(&self, metric: Metric, top_n: usize) -> Result<Vec<Measurement>, SourceError> {
        (**self).fetch_ranked(metric, top_n)
    }

    fn search_city(&self, city: &str, metric: Metric) -> Result<Measurement, SourceError> {
        (**self).search_city(city, metric)
    }
}

/// Errors that can arise when fetching or decoding data source responses.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The request never produced a response (connection refused, timeout).
    Transport(String),
    /// Non-2xx HTTP response without an error body.
    HttpError(u16),
    /// The API answered with an `{"error": ...}` body.
    Api { status: u16, message: String },
    /// The response body could not be deserialized.
    ParseError(String),
    /// The queried city could not be located.
    NotFound(String),
    /// A single-record response that could not become a measurement.
    InvalidRecord(RecordError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "Request failed: {}", msg),
            SourceError::HttpError(code) => write!(f, "HTTP error: {}", code),
            SourceError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            SourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SourceError::NotFound(what) => write!(f, "Not found: {}", what),
            SourceError::InvalidRecord(e) => write!(f, "Invalid record: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Transport(e.to_string())
    }
}
