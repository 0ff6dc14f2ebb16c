//! Core data types for the AirLens client core.
//!
//! This module defines the shared domain model imported by all other modules.
//! It holds no I/O. The only logic here is the validation that keeps a
//! `Measurement` well-formed from the moment it is received: once built, a
//! measurement is never mutated, only replaced.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pollutants
// ---------------------------------------------------------------------------

/// The fixed set of pollutants reported by the data source.
///
/// Serialized with the upper-case codes the API uses as JSON keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "SO2")]
    So2,
}

impl Pollutant {
    /// All pollutants in display order.
    pub const ALL: [Pollutant; 4] = [Pollutant::Co, Pollutant::No2, Pollutant::O3, Pollutant::So2];

    /// Wire code, e.g. `"NO2"`.
    pub fn code(self) -> &'static str {
        match self {
            Pollutant::Co => "CO",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
        }
    }

    /// Case-insensitive lookup by wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Metric (refresh parameter)
// ---------------------------------------------------------------------------

/// The metric a refresh is parameterized by.
///
/// `Composite` asks the data source for its single aggregate score;
/// `Gas` narrows the query to one pollutant. In both cases the data source
/// returns normalized composite scores; raw-to-normalized scaling is its
/// concern, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Metric {
    #[default]
    Composite,
    Gas(Pollutant),
}

impl Metric {
    /// Value for the API's `gas` query parameter, if any.
    pub fn gas_param(self) -> Option<&'static str> {
        match self {
            Metric::Composite => None,
            Metric::Gas(p) => Some(p.code()),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Composite => f.write_str("composite"),
            Metric::Gas(p) => write!(f, "{}", p),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("composite") {
            return Ok(Metric::Composite);
        }
        Pollutant::from_code(s)
            .map(Metric::Gas)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

impl TryFrom<String> for Metric {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Score and position
// ---------------------------------------------------------------------------

/// A composite pollution score: finite and non-negative.
///
/// The only way to build one from a raw float is `Score::new`, so anything
/// holding a `Score` can be classified without a failure path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Score(f64);

impl Score {
    pub fn new(value: f64) -> Result<Self, InvalidScore> {
        if value.is_finite() && value >= 0.0 {
            Ok(Score(value))
        } else {
            Err(InvalidScore { value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// WGS84 position in degrees, using the rendering surface's `lat`/`lng`
/// naming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinates> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);
        if lat_ok && lng_ok {
            Ok(GeoPoint { lat, lng })
        } else {
            Err(InvalidCoordinates { lat, lng })
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// One point measurement as received from the data source.
///
/// Fields are private: a measurement is immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    position: GeoPoint,
    city: Option<String>,
    pollutants: BTreeMap<Pollutant, f64>,
    composite: Score,
}

impl Measurement {
    pub fn new(
        position: GeoPoint,
        city: Option<String>,
        pollutants: BTreeMap<Pollutant, f64>,
        composite: Score,
    ) -> Self {
        let city = city.filter(|c| !c.trim().is_empty());
        Self {
            position,
            city,
            pollutants,
            composite,
        }
    }

    /// Returns a copy of this record carrying `city` as its display name.
    pub fn with_city(&self, city: &str) -> Self {
        Self::new(
            self.position,
            Some(city.to_string()),
            self.pollutants.clone(),
            self.composite,
        )
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn latitude(&self) -> f64 {
        self.position.lat
    }

    pub fn longitude(&self) -> f64 {
        self.position.lng
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn pollutants(&self) -> &BTreeMap<Pollutant, f64> {
        &self.pollutants
    }

    pub fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        self.pollutants.get(&pollutant).copied()
    }

    pub fn composite(&self) -> Score {
        self.composite
    }
}

/// A measurement and its 1-based position in the "most polluted" ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub measurement: Measurement,
}

/// Assigns 1-based ranks in the order the data source returned the entries.
pub fn rank_in_order(measurements: Vec<Measurement>) -> Vec<RankedEntry> {
    measurements
        .into_iter()
        .enumerate()
        .map(|(i, measurement)| RankedEntry {
            rank: i + 1,
            measurement,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A composite score that is negative, NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidScore {
    pub value: f64,
}

impl fmt::Display for InvalidScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid score: {} (must be finite and non-negative)", self.value)
    }
}

impl std::error::Error for InvalidScore {}

/// Latitude outside [-90, 90] or longitude outside [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinates {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for InvalidCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid coordinates: lat {}, lng {}", self.lat, self.lng)
    }
}

impl std::error::Error for InvalidCoordinates {}

/// Why a wire record could not become a `Measurement`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The record carried no composite value at all.
    MissingScore,
    InvalidScore(InvalidScore),
    InvalidCoordinates(InvalidCoordinates),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingScore => write!(f, "Missing composite score"),
            RecordError::InvalidScore(e) => write!(f, "{}", e),
            RecordError::InvalidCoordinates(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RecordError {}

impl From<InvalidScore> for RecordError {
    fn from(e: InvalidScore) -> Self {
        RecordError::InvalidScore(e)
    }
}

impl From<InvalidCoordinates> for RecordError {
    fn from(e: InvalidCoordinates) -> Self {
        RecordError::InvalidCoordinates(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
