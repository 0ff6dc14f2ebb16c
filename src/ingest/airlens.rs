//! AirLens REST API client.
//!
//! Endpoints (all `GET`, JSON):
//! - `/aqi[?gas=NO2]`: every current measurement
//! - `/polluted?top=10[&gas=NO2]`: most polluted entries, most polluted first
//! - `/search?city=Paris[&gas=NO2]`: nearest measurement to a geocoded city
//!
//! Failures come back as `{"error": "..."}` bodies; a missing city is a 404.
//!
//! Records carry the longitude under `lon`, while the rendering surface
//! expects `lng`. `WireRecord::into_measurement` is the only place that
//! mapping happens.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::ingest::{DataSource, SourceError};
use crate::logging;
use crate::model::{GeoPoint, Measurement, Metric, Pollutant, RecordError, Score};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

// ============================================================================
// Wire Structures
// ============================================================================

/// One record as returned by `/aqi`, `/polluted` and `/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub composite: Option<f64>,
    #[serde(rename = "CO", default)]
    pub co: Option<f64>,
    #[serde(rename = "NO2", default)]
    pub no2: Option<f64>,
    #[serde(rename = "O3", default)]
    pub o3: Option<f64>,
    #[serde(rename = "SO2", default)]
    pub so2: Option<f64>,
}

impl WireRecord {
    /// Converts a wire record into a validated measurement.
    ///
    /// A record without a composite value is rejected rather than defaulted.
    pub fn into_measurement(self) -> Result<Measurement, RecordError> {
        let position = GeoPoint::new(self.lat, self.lon)?;
        let composite = Score::new(self.composite.ok_or(RecordError::MissingScore)?)?;
        let pollutants: BTreeMap<Pollutant, f64> = [
            (Pollutant::Co, self.co),
            (Pollutant::No2, self.no2),
            (Pollutant::O3, self.o3),
            (Pollutant::So2, self.so2),
        ]
        .into_iter()
        .filter_map(|(p, v)| v.map(|v| (p, v)))
        .collect();
        Ok(Measurement::new(position, self.city, pollutants, composite))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Result of decoding a list response: the usable measurements plus the
/// reason each dropped record was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub measurements: Vec<Measurement>,
    pub rejected: Vec<RecordError>,
}

// ============================================================================
// URL Construction
// ============================================================================

fn build_url(base_url: &str, path: &str, params: &[(&str, String)]) -> Result<Url, SourceError> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), path);
    let parsed = if params.is_empty() {
        Url::parse(&raw)
    } else {
        Url::parse_with_params(&raw, params)
    };
    parsed.map_err(|e| SourceError::Transport(format!("invalid URL '{}': {}", raw, e)))
}

fn gas_params(metric: Metric) -> Vec<(&'static str, String)> {
    metric
        .gas_param()
        .map(|gas| vec![("gas", gas.to_string())])
        .unwrap_or_default()
}

pub fn build_aqi_url(base_url: &str, metric: Metric) -> Result<Url, SourceError> {
    build_url(base_url, "aqi", &gas_params(metric))
}

pub fn build_polluted_url(base_url: &str, metric: Metric, top_n: usize) -> Result<Url, SourceError> {
    let mut params = vec![("top", top_n.to_string())];
    params.extend(gas_params(metric));
    build_url(base_url, "polluted", &params)
}

pub fn build_search_url(base_url: &str, city: &str, metric: Metric) -> Result<Url, SourceError> {
    let mut params = vec![("city", city.to_string())];
    params.extend(gas_params(metric));
    build_url(base_url, "search", &params)
}

// ============================================================================
// Response Parsing
// ============================================================================

fn api_error(status: u16, message: String) -> SourceError {
    if status == 404 {
        SourceError::NotFound(message)
    } else {
        SourceError::Api { status, message }
    }
}

/// Maps `{"error": ...}` bodies and non-2xx statuses to an error.
fn error_from_response(status: u16, body: &str) -> Option<SourceError> {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return Some(api_error(status, error));
    }
    if !(200..300).contains(&status) {
        return Some(SourceError::HttpError(status));
    }
    None
}

/// Decodes a JSON array of records, dropping records that fail validation.
pub fn parse_measurements(body: &str) -> Result<Batch, SourceError> {
    let records: Vec<WireRecord> =
        serde_json::from_str(body).map_err(|e| SourceError::ParseError(e.to_string()))?;

    let mut measurements = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for record in records {
        match record.into_measurement() {
            Ok(m) => measurements.push(m),
            Err(e) => rejected.push(e),
        }
    }
    Ok(Batch {
        measurements,
        rejected,
    })
}

/// Decodes an `/aqi` or `/polluted` response.
pub fn parse_list_body(status: u16, body: &str) -> Result<Batch, SourceError> {
    if let Some(err) = error_from_response(status, body) {
        return Err(err);
    }
    parse_measurements(body)
}

/// Decodes a `/search` response into exactly one measurement.
pub fn parse_search_body(status: u16, body: &str) -> Result<Measurement, SourceError> {
    if let Some(err) = error_from_response(status, body) {
        return Err(match err {
            SourceError::HttpError(404) => SourceError::NotFound("City not found".to_string()),
            other => other,
        });
    }
    let record: WireRecord =
        serde_json::from_str(body).map_err(|e| SourceError::ParseError(e.to_string()))?;
    record.into_measurement().map_err(SourceError::InvalidRecord)
}

// ============================================================================
// HTTP Source
// ============================================================================

/// Blocking HTTP implementation of `DataSource`.
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: Url) -> Result<(u16, String), SourceError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok((status, body))
    }

    fn fetch_list(&self, endpoint: &str, url: Url) -> Result<Vec<Measurement>, SourceError> {
        let (status, body) = self.get(url)?;
        let batch = parse_list_body(status, &body)?;
        logging::log_rejected_records(endpoint, batch.measurements.len(), &batch.rejected);
        Ok(batch.measurements)
    }
}

impl DataSource for HttpSource {
    fn fetch_measurements(&self, metric: Metric) -> Result<Vec<Measurement>, SourceError> {
        let url = build_aqi_url(&self.base_url, metric)?;
        self.fetch_list("/aqi", url)
    }

    fn fetch_ranked(&self, metric: Metric, top_n: usize) -> Result<Vec<Measurement>, SourceError> {
        let url = build_polluted_url(&self.base_url, metric, top_n)?;
        self.fetch_list("/polluted", url)
    }

    fn search_city(&self, city: &str, metric: Metric) -> Result<Measurement, SourceError> {
        let url = build_search_url(&self.base_url, city, metric)?;
        let (status, body) = self.get(url)?;
        parse_search_body(status, &body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- URLs ---------------------------------------------------------------

    #[test]
    fn test_aqi_url_omits_gas_for_composite() {
        let url = build_aqi_url("http://127.0.0.1:5000/", Metric::Composite).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/aqi");
    }

    #[test]
    fn test_polluted_url_carries_top_and_gas() {
        let url = build_polluted_url(DEFAULT_BASE_URL, Metric::Gas(Pollutant::No2), 10).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/polluted?top=10&gas=NO2");
    }

    #[test]
    fn test_search_url_encodes_city_name() {
        let url = build_search_url(DEFAULT_BASE_URL, "São Paulo & Co", Metric::Composite).unwrap();
        let city: Vec<_> = url.query_pairs().filter(|(k, _)| k == "city").collect();
        assert_eq!(city.len(), 1);
        assert_eq!(city[0].1, "São Paulo & Co");
        assert!(!url.as_str().contains(' '));
    }

    // --- Record mapping -----------------------------------------------------

    #[test]
    fn test_lon_is_mapped_to_longitude_not_latitude() {
        let body = r#"[{"lat": 48.85, "lon": 2.35, "composite": 0.55, "city": "Paris"}]"#;
        let batch = parse_measurements(body).expect("valid body");
        let m = &batch.measurements[0];
        assert_eq!(m.latitude(), 48.85);
        assert_eq!(m.longitude(), 2.35);
        assert_eq!(m.position().lng, 2.35);
        assert_eq!(m.city(), Some("Paris"));
    }

    #[test]
    fn test_pollutant_values_are_read_from_upper_case_keys() {
        let body = r#"[{"lat": 0, "lon": 0, "composite": 0.1,
                        "CO": 1.9e18, "NO2": 3.4e15, "O3": 6.1e18, "SO2": 2.2e14}]"#;
        let batch = parse_measurements(body).unwrap();
        let m = &batch.measurements[0];
        assert_eq!(m.pollutant(Pollutant::Co), Some(1.9e18));
        assert_eq!(m.pollutant(Pollutant::No2), Some(3.4e15));
        assert_eq!(m.pollutant(Pollutant::O3), Some(6.1e18));
        assert_eq!(m.pollutant(Pollutant::So2), Some(2.2e14));
    }

    #[test]
    fn test_records_without_composite_are_rejected_not_defaulted() {
        let body = r#"[
            {"lat": 10, "lon": 20, "composite": 0.3},
            {"lat": 11, "lon": 21, "value": 4.0e15},
            {"lat": 12, "lon": 22, "composite": null}
        ]"#;
        let batch = parse_measurements(body).unwrap();
        assert_eq!(batch.measurements.len(), 1);
        assert_eq!(batch.rejected, vec![RecordError::MissingScore, RecordError::MissingScore]);
    }

    #[test]
    fn test_records_with_invalid_values_are_rejected() {
        let body = r#"[
            {"lat": 95, "lon": 20, "composite": 0.3},
            {"lat": 10, "lon": 20, "composite": -1.0}
        ]"#;
        let batch = parse_measurements(body).unwrap();
        assert!(batch.measurements.is_empty());
        assert!(matches!(batch.rejected[0], RecordError::InvalidCoordinates(_)));
        assert!(matches!(batch.rejected[1], RecordError::InvalidScore(_)));
    }

    // --- Error responses ----------------------------------------------------

    #[test]
    fn test_list_error_body_becomes_api_error() {
        let body = r#"{"error": "Invalid gas 'PM25'. Choose from ['CO', 'NO2']"}"#;
        let result = parse_list_body(400, body);
        assert!(matches!(result, Err(SourceError::Api { status: 400, .. })), "got {:?}", result);
    }

    #[test]
    fn test_list_non_json_server_error_is_http_error() {
        assert_eq!(
            parse_list_body(502, "<html>Bad Gateway</html>"),
            Err(SourceError::HttpError(502))
        );
    }

    #[test]
    fn test_malformed_list_body_is_parse_error() {
        assert!(matches!(parse_list_body(200, "[{\"lat\": 1}"), Err(SourceError::ParseError(_))));
    }

    #[test]
    fn test_search_404_is_not_found() {
        let result = parse_search_body(404, r#"{"error": "City not found"}"#);
        assert_eq!(result, Err(SourceError::NotFound("City not found".to_string())));
        let bare = parse_search_body(404, "");
        assert!(matches!(bare, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_search_success_yields_one_measurement() {
        let body = r#"{"city": "Paris", "lat": 48.85, "lon": 2.35, "composite": 0.55,
                       "CO": 1.2e18, "NO2": 5.0e15, "O3": 6.0e18, "SO2": 1.0e15}"#;
        let m = parse_search_body(200, body).expect("valid search body");
        assert_eq!(m.city(), Some("Paris"));
        assert_eq!((m.latitude(), m.longitude()), (48.85, 2.35));
        assert_eq!(m.composite().value(), 0.55);
    }

    #[test]
    fn test_search_without_composite_is_missing_score() {
        let body = r#"{"city": "Paris", "lat": 48.85, "lon": 2.35, "gas": "NO2", "value": null}"#;
        assert_eq!(
            parse_search_body(200, body),
            Err(SourceError::InvalidRecord(RecordError::MissingScore))
        );
    }

    #[test]
    fn test_search_server_error_body_is_not_mistaken_for_not_found() {
        let result = parse_search_body(500, r#"{"error": "geocoder timed out"}"#);
        assert!(matches!(result, Err(SourceError::Api { status: 500, .. })));
    }

    #[test]
    fn test_geocoder_failure_mentioning_not_found_is_still_a_server_error() {
        let body = r#"{"error": "Non-successful status code 404 Not Found"}"#;
        let result = parse_search_body(500, body);
        assert_eq!(
            result,
            Err(SourceError::Api {
                status: 500,
                message: "Non-successful status code 404 Not Found".to_string()
            })
        );
        let listed = parse_list_body(500, body);
        assert!(matches!(listed, Err(SourceError::Api { status: 500, .. })), "got {:?}", listed);
    }
}
