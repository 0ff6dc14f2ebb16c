//! Render-ready view of the current state.
//!
//! `ViewModel::snapshot` is a pure function of the measurement store, the
//! highlight controller, and the view's own display state. Nothing it
//! returns is stored, so the rendered globe cannot drift from its sources.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{SeverityScale, SeverityTier, color_of, label_of};
use crate::config::GlobeConfig;
use crate::highlight::HighlightController;
use crate::model::{GeoPoint, Measurement, Metric};
use crate::pollutants::POLLUTANT_REGISTRY;
use crate::store::{MeasurementStore, staleness};

// ---------------------------------------------------------------------------
// Label formatting
// ---------------------------------------------------------------------------

/// Two-decimal fixed notation, e.g. `0.55`.
pub fn format_fixed(value: f64) -> String {
    format!("{:.2}", value)
}

/// Two-decimal scientific notation with a signed exponent, e.g. `3.40e+15`.
///
/// Column densities span roughly 1e14 to 1e17, so fixed notation is
/// unreadable for them.
pub fn format_scientific(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.2e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if exponent.starts_with('-') => {
            format!("{}e{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => format!("{}e+{}", mantissa, exponent),
        None => formatted,
    }
}

fn coordinates_label(position: GeoPoint) -> String {
    format!("Lat:{}, Lon:{}", format_fixed(position.lat), format_fixed(position.lng))
}

/// Hover label for a globe point: its name (or coordinates) and composite.
pub fn point_label(measurement: &Measurement) -> String {
    let name = measurement
        .city()
        .map(String::from)
        .unwrap_or_else(|| coordinates_label(measurement.position()));
    format!("{}\nComposite: {}", name, format_fixed(measurement.composite().value()))
}

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointView {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub radius: f64,
    pub color: &'static str,
    pub label: String,
    #[serde(skip)]
    pub tier: SeverityTier,
    pub highlighted: bool,
}

/// Pulsing ring drawn around the highlighted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingView {
    pub lat: f64,
    pub lng: f64,
    pub color: String,
    pub max_radius: f64,
    pub propagation_speed: f64,
    pub repeat_period_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub rank: usize,
    pub text: String,
    pub color: &'static str,
    pub tier: SeverityTier,
    pub position: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollutantRow {
    pub code: &'static str,
    pub name: &'static str,
    pub value: String,
}

/// Side panel describing the highlighted measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPanel {
    pub title: String,
    pub status: &'static str,
    pub status_color: &'static str,
    pub composite: String,
    pub pollutants: Vec<PollutantRow>,
    pub latitude: String,
    pub longitude: String,
    pub from_search: bool,
}

/// Non-blocking, user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    DataSourceUnavailable(String),
    CityNotFound(String),
    MissingScore(String),
    StaleSnapshot { age_minutes: u64 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DataSourceUnavailable(detail) => {
                write!(f, "Air quality data is unavailable right now ({}). Showing the last loaded data.", detail)
            }
            Notice::CityNotFound(city) => write!(f, "City not found: {}", city),
            Notice::MissingScore(city) => write!(f, "No pollution score is available for {}", city),
            Notice::StaleSnapshot { age_minutes } => {
                write!(f, "Data was last refreshed {} minutes ago", age_minutes)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    /// Metric the displayed data was fetched for; `None` until the first
    /// successful refresh.
    pub metric: Option<Metric>,
    /// Base points followed by the highlighted point, if any.
    pub points: Vec<PointView>,
    pub highlighted: Option<Measurement>,
    /// Non-empty exactly when something is highlighted.
    pub rings: Vec<RingView>,
    pub navigation_target: Option<GeoPoint>,
    pub ranked: Vec<RankedRow>,
    pub ranked_panel_open: bool,
    pub detail: Option<DetailPanel>,
    pub notice: Option<Notice>,
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ViewModel {
    scale: SeverityScale,
    globe: GlobeConfig,
    ranked_panel_open: bool,
    notice: Option<Notice>,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new(SeverityScale::default(), GlobeConfig::default())
    }
}

impl ViewModel {
    pub fn new(scale: SeverityScale, globe: GlobeConfig) -> Self {
        Self {
            scale,
            globe,
            ranked_panel_open: true,
            notice: None,
        }
    }

    pub fn scale(&self) -> &SeverityScale {
        &self.scale
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Clears the current notice only if `matches` accepts it.
    pub fn clear_notice_if(&mut self, matches: impl Fn(&Notice) -> bool) {
        if self.notice.as_ref().is_some_and(matches) {
            self.notice = None;
        }
    }

    pub fn ranked_panel_open(&self) -> bool {
        self.ranked_panel_open
    }

    pub fn toggle_ranked_panel(&mut self) -> bool {
        self.ranked_panel_open = !self.ranked_panel_open;
        self.ranked_panel_open
    }

    pub fn tier_of(&self, measurement: &Measurement) -> SeverityTier {
        self.scale.tier_for(measurement.composite())
    }

    fn point_view(&self, measurement: &Measurement, highlighted: bool) -> PointView {
        let tier = self.tier_of(measurement);
        PointView {
            lat: measurement.latitude(),
            lng: measurement.longitude(),
            altitude: self.globe.point_altitude,
            radius: if highlighted {
                self.globe.highlight_radius
            } else {
                self.globe.point_radius
            },
            color: color_of(tier),
            label: point_label(measurement),
            tier,
            highlighted,
        }
    }

    fn ring_view(&self, measurement: &Measurement) -> RingView {
        RingView {
            lat: measurement.latitude(),
            lng: measurement.longitude(),
            color: self.globe.ring_color.clone(),
            max_radius: self.globe.ring_max_radius,
            propagation_speed: self.globe.ring_propagation_speed,
            repeat_period_ms: self.globe.ring_repeat_period_ms,
        }
    }

    fn detail_panel(&self, measurement: &Measurement, from_search: bool) -> DetailPanel {
        let tier = self.tier_of(measurement);
        let pollutants = POLLUTANT_REGISTRY
            .iter()
            .filter_map(|info| {
                measurement.pollutant(info.pollutant).map(|value| PollutantRow {
                    code: info.pollutant.code(),
                    name: info.name,
                    value: format_scientific(value),
                })
            })
            .collect();

        DetailPanel {
            title: measurement
                .city()
                .map(String::from)
                .unwrap_or_else(|| coordinates_label(measurement.position())),
            status: label_of(tier),
            status_color: color_of(tier),
            composite: format_fixed(measurement.composite().value()),
            pollutants,
            latitude: format_fixed(measurement.latitude()),
            longitude: format_fixed(measurement.longitude()),
            from_search,
        }
    }

    pub fn snapshot(&self, store: &MeasurementStore, highlight: &HighlightController) -> ViewSnapshot {
        self.snapshot_at(store, highlight, Utc::now())
    }

    /// `snapshot` with an injected clock for the staleness notice.
    pub fn snapshot_at(
        &self,
        store: &MeasurementStore,
        highlight: &HighlightController,
        now: DateTime<Utc>,
    ) -> ViewSnapshot {
        let highlighted = highlight.highlighted().cloned();

        let mut points: Vec<PointView> = store
            .points()
            .iter()
            .map(|m| self.point_view(m, false))
            .collect();
        // Appended as-is; a highlighted base point appears twice.
        if let Some(m) = &highlighted {
            points.push(self.point_view(m, true));
        }

        let rings = highlighted.iter().map(|m| self.ring_view(m)).collect();
        let detail = highlighted
            .as_ref()
            .map(|m| self.detail_panel(m, highlight.is_from_search()));

        let ranked = store
            .ranked()
            .iter()
            .map(|entry| {
                let tier = self.tier_of(&entry.measurement);
                RankedRow {
                    rank: entry.rank,
                    text: format!(
                        "{} - Status: {}",
                        entry.measurement.city().unwrap_or("Unknown"),
                        label_of(tier)
                    ),
                    color: color_of(tier),
                    tier,
                    position: entry.measurement.position(),
                }
            })
            .collect();

        let notice = self.notice.clone().or_else(|| {
            let refreshed_at = store.refreshed_at()?;
            store
                .is_stale_at(self.globe.stale_after_minutes, now)
                .then(|| Notice::StaleSnapshot {
                    age_minutes: staleness::age_minutes(refreshed_at, now),
                })
        });

        ViewSnapshot {
            metric: store.applied_metric(),
            navigation_target: highlighted.as_ref().map(|m| m.position()),
            points,
            highlighted,
            rings,
            ranked,
            ranked_panel_open: self.ranked_panel_open,
            detail,
            notice,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
