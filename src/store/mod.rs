//! Measurement store: the current points and the current ranked list.
//!
//! A refresh is split in two so an event loop can suspend between them:
//!
//! 1. `begin_refresh(metric)` bumps the generation and hands out a ticket.
//! 2. `apply_refresh(ticket, result)` applies the completed fetch, but only
//!    if the ticket's generation is still the latest one issued.
//!
//! A response for an older generation is discarded, so a slow request for a
//! previous metric can never overwrite a faster, newer one. Points and
//! ranked list are always replaced together; a failed fetch leaves the
//! previous snapshot in place.

pub mod staleness;

use std::fmt;

use chrono::{DateTime, Utc};

use crate::ingest::{DataSource, SourceError};
use crate::logging::{self, Component};
use crate::model::{Measurement, Metric, RankedEntry, rank_in_order};

pub const DEFAULT_TOP_N: usize = 10;

/// Proof that a refresh was issued, carrying its generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    metric: Metric,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }
}

/// Both collections from one refresh cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefreshPayload {
    pub points: Vec<Measurement>,
    pub ranked: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied { points: usize, ranked: usize },
    /// The fetch failed; the previous snapshot was kept.
    Failed(RefreshError),
    /// A newer refresh was issued after this one; the response was dropped.
    Discarded { generation: u64, current: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshError {
    DataSourceUnavailable(SourceError),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::DataSourceUnavailable(e) => write!(f, "Data source unavailable: {}", e),
        }
    }
}

impl std::error::Error for RefreshError {}

#[derive(Debug, Clone)]
pub struct MeasurementStore {
    top_n: usize,
    generation: u64,
    metric: Metric,
    applied_metric: Option<Metric>,
    points: Vec<Measurement>,
    ranked: Vec<RankedEntry>,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<RefreshError>,
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl MeasurementStore {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            generation: 0,
            metric: Metric::default(),
            applied_metric: None,
            points: Vec::new(),
            ranked: Vec::new(),
            refreshed_at: None,
            last_error: None,
        }
    }

    pub fn points(&self) -> &[Measurement] {
        &self.points
    }

    pub fn ranked(&self) -> &[RankedEntry] {
        &self.ranked
    }

    /// Metric of the most recently issued refresh.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Metric the current points and ranked list were fetched for; `None`
    /// before the first successful refresh.
    pub fn applied_metric(&self) -> Option<Metric> {
        self.applied_metric
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the current snapshot was applied; `None` before the first
    /// successful refresh.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Error from the latest applied refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<&RefreshError> {
        self.last_error.as_ref()
    }

    pub fn is_current(&self, ticket: &RefreshTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Starts a refresh for `metric`. Any ticket issued earlier becomes stale.
    pub fn begin_refresh(&mut self, metric: Metric) -> RefreshTicket {
        self.generation += 1;
        self.metric = metric;
        logging::debug(
            Component::Store,
            Some(&metric.to_string()),
            &format!("refresh issued (generation {})", self.generation),
        );
        RefreshTicket {
            generation: self.generation,
            metric,
        }
    }

    /// Fetches both collections for `ticket`. Either failing fails the pair.
    pub fn fetch(
        source: &dyn DataSource,
        ticket: &RefreshTicket,
        top_n: usize,
    ) -> Result<RefreshPayload, SourceError> {
        let points = source.fetch_measurements(ticket.metric)?;
        let ranked = source.fetch_ranked(ticket.metric, top_n)?;
        Ok(RefreshPayload { points, ranked })
    }

    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<RefreshPayload, SourceError>,
    ) -> RefreshOutcome {
        self.apply_refresh_at(ticket, result, Utc::now())
    }

    /// `apply_refresh` with an injected clock.
    pub fn apply_refresh_at(
        &mut self,
        ticket: RefreshTicket,
        result: Result<RefreshPayload, SourceError>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        let metric = ticket.metric.to_string();

        if !self.is_current(&ticket) {
            logging::debug(
                Component::Store,
                Some(&metric),
                &format!(
                    "discarding stale response (generation {}, current {})",
                    ticket.generation, self.generation
                ),
            );
            return RefreshOutcome::Discarded {
                generation: ticket.generation,
                current: self.generation,
            };
        }

        match result {
            Ok(payload) => {
                self.points = payload.points;
                self.ranked = rank_in_order(payload.ranked);
                self.applied_metric = Some(ticket.metric);
                self.refreshed_at = Some(now);
                self.last_error = None;
                logging::info(
                    Component::Store,
                    Some(&metric),
                    &format!(
                        "refreshed: {} points, {} ranked",
                        self.points.len(),
                        self.ranked.len()
                    ),
                );
                RefreshOutcome::Applied {
                    points: self.points.len(),
                    ranked: self.ranked.len(),
                }
            }
            Err(e) => {
                logging::log_source_failure(Component::Store, Some(&metric), "refresh", &e);
                let err = RefreshError::DataSourceUnavailable(e);
                self.last_error = Some(err.clone());
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Blocking refresh: issue, fetch, apply.
    pub fn refresh(&mut self, source: &dyn DataSource, metric: Metric) -> RefreshOutcome {
        let ticket = self.begin_refresh(metric);
        let result = Self::fetch(source, &ticket, self.top_n);
        self.apply_refresh(ticket, result)
    }

    /// Whether the current snapshot is older than `max_age_minutes` at `now`.
    /// An empty store is never stale.
    pub fn is_stale_at(&self, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
        self.refreshed_at
            .is_some_and(|at| staleness::is_stale_at(at, max_age_minutes, now))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
