//! Development mode: serve measurements from local fixture files
//!
//! When the AirLens API is not running, use this module to drive the
//! client core from a saved `/aqi` response instead.

use std::collections::HashMap;
use std::path::Path;

use crate::ingest::airlens::parse_measurements;
use crate::ingest::{DataSource, SourceError};
use crate::logging;
use crate::model::{Measurement, Metric};

/// In-memory data source backed by saved `/aqi` responses.
///
/// Each metric may have its own dataset; a metric without one falls back to
/// the composite dataset.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    datasets: HashMap<Metric, Vec<Measurement>>,
}

impl FixtureSource {
    /// Create a fixture source serving `measurements` for every metric
    pub fn new(measurements: Vec<Measurement>) -> Self {
        Self::default().with_dataset(Metric::Composite, measurements)
    }

    /// Register the dataset served for `metric`
    pub fn with_dataset(mut self, metric: Metric, measurements: Vec<Measurement>) -> Self {
        self.datasets.insert(metric, measurements);
        self
    }

    /// Parse a saved `/aqi` response body
    ///
    /// Invalid records are dropped and logged the same way the HTTP source
    /// logs them.
    pub fn from_json(body: &str) -> Result<Self, SourceError> {
        let batch = parse_measurements(body)?;
        logging::log_rejected_records("fixture", batch.measurements.len(), &batch.rejected);
        Ok(Self::new(batch.measurements))
    }

    /// Load a saved `/aqi` response from disk
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Transport(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&body)
    }

    fn dataset(&self, metric: Metric) -> &[Measurement] {
        self.datasets
            .get(&metric)
            .or_else(|| self.datasets.get(&Metric::Composite))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl DataSource for FixtureSource {
    fn fetch_measurements(&self, metric: Metric) -> Result<Vec<Measurement>, SourceError> {
        Ok(self.dataset(metric).to_vec())
    }

    /// Most polluted first, like the live `/polluted` endpoint.
    fn fetch_ranked(&self, metric: Metric, top_n: usize) -> Result<Vec<Measurement>, SourceError> {
        let mut ranked = self.dataset(metric).to_vec();
        ranked.sort_by(|a, b| b.composite().value().total_cmp(&a.composite().value()));
        ranked.truncate(top_n);
        Ok(ranked)
    }

    fn search_city(&self, city: &str, metric: Metric) -> Result<Measurement, SourceError> {
        let wanted = city.trim().to_lowercase();
        self.dataset(metric)
            .iter()
            .find(|m| m.city().is_some_and(|c| c.to_lowercase() == wanted))
            .cloned()
            .ok_or_else(|| SourceError::NotFound("City not found".to_string()))
    }
}
