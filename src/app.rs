//! Event dispatch for the client core.
//!
//! `App` owns the data source and every piece of state, and is the only
//! place user and network events are routed. A rendering surface feeds it
//! `AppEvent`s and redraws from `App::snapshot`.

use crate::config::Config;
use crate::highlight::{CameraControl, HighlightController, Navigation};
use crate::ingest::{DataSource, SourceError};
use crate::logging::{self, Component};
use crate::model::{Measurement, Metric};
use crate::search::{SearchError, SearchResolver};
use crate::store::{MeasurementStore, RefreshOutcome, RefreshPayload, RefreshTicket};
use crate::view::{Notice, ViewModel, ViewSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The user picked another metric; refetches both collections.
    MetricChanged(Metric),
    /// Refetch for the current metric.
    Refresh,
    /// A fetch started with `App::begin_refresh` has finished.
    RefreshCompleted {
        ticket: RefreshTicket,
        result: Result<RefreshPayload, SourceError>,
    },
    SearchSubmitted(String),
    PointSelected(Measurement),
    /// 1-based rank in the current ranked list.
    RankedEntrySelected(usize),
    Dismissed,
    ToggleRankedPanel,
    NoticeDismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Refreshed(RefreshOutcome),
    Navigated(Navigation),
    Notified(Notice),
    /// Display state changed without navigation or data.
    Updated,
    /// Nothing to do, e.g. a blank search or an unknown rank.
    Ignored,
}

pub struct App {
    source: Box<dyn DataSource>,
    store: MeasurementStore,
    resolver: SearchResolver,
    highlight: HighlightController,
    view: ViewModel,
    default_metric: Metric,
}

impl App {
    pub fn new(source: Box<dyn DataSource>, config: &Config) -> Self {
        Self {
            source,
            store: MeasurementStore::new(config.api.top_n),
            resolver: SearchResolver::new(),
            highlight: HighlightController::with_flight(
                config.globe.camera_altitude,
                config.globe.fly_duration_ms,
            ),
            view: ViewModel::new(config.severity, config.globe.clone()),
            default_metric: config.api.default_metric,
        }
    }

    pub fn store(&self) -> &MeasurementStore {
        &self.store
    }

    pub fn highlight(&self) -> &HighlightController {
        &self.highlight
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    pub fn resolver(&self) -> &SearchResolver {
        &self.resolver
    }

    /// Attaches the rendering surface's camera.
    pub fn mount_surface(&mut self, camera: Box<dyn CameraControl>) {
        self.highlight.mount(camera);
    }

    pub fn unmount_surface(&mut self) -> Option<Box<dyn CameraControl>> {
        self.highlight.unmount()
    }

    /// Initial load for the configured default metric.
    pub fn start(&mut self) -> EventOutcome {
        self.handle(AppEvent::MetricChanged(self.default_metric))
    }

    /// First half of a non-blocking refresh. Fetch with `App::fetch` (or any
    /// other way) and send the result back as `AppEvent::RefreshCompleted`.
    pub fn begin_refresh(&mut self, metric: Metric) -> RefreshTicket {
        self.store.begin_refresh(metric)
    }

    pub fn fetch(&self, ticket: &RefreshTicket) -> Result<RefreshPayload, SourceError> {
        MeasurementStore::fetch(self.source.as_ref(), ticket, self.store.top_n())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.snapshot(&self.store, &self.highlight)
    }

    pub fn handle(&mut self, event: AppEvent) -> EventOutcome {
        match event {
            AppEvent::MetricChanged(metric) => {
                let ticket = self.begin_refresh(metric);
                let result = self.fetch(&ticket);
                self.complete_refresh(ticket, result)
            }
            AppEvent::Refresh => {
                let ticket = self.begin_refresh(self.store.metric());
                let result = self.fetch(&ticket);
                self.complete_refresh(ticket, result)
            }
            AppEvent::RefreshCompleted { ticket, result } => self.complete_refresh(ticket, result),
            AppEvent::SearchSubmitted(query) => self.search(&query),
            AppEvent::PointSelected(measurement) => {
                EventOutcome::Navigated(self.highlight.select(measurement))
            }
            AppEvent::RankedEntrySelected(rank) => {
                let entry = self.store.ranked().iter().find(|e| e.rank == rank);
                match entry.map(|e| e.measurement.clone()) {
                    Some(measurement) => EventOutcome::Navigated(self.highlight.select(measurement)),
                    None => {
                        logging::debug(
                            Component::View,
                            None,
                            &format!("no ranked entry at position {}", rank),
                        );
                        EventOutcome::Ignored
                    }
                }
            }
            AppEvent::Dismissed => {
                if self.highlight.dismiss() {
                    EventOutcome::Updated
                } else {
                    EventOutcome::Ignored
                }
            }
            AppEvent::ToggleRankedPanel => {
                self.view.toggle_ranked_panel();
                EventOutcome::Updated
            }
            AppEvent::NoticeDismissed => {
                self.view.clear_notice();
                EventOutcome::Updated
            }
        }
    }

    fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<RefreshPayload, SourceError>,
    ) -> EventOutcome {
        let outcome = self.store.apply_refresh(ticket, result);
        match &outcome {
            RefreshOutcome::Applied { .. } => {
                self.view
                    .clear_notice_if(|n| matches!(n, Notice::DataSourceUnavailable(_)));
            }
            RefreshOutcome::Failed(err) => {
                let notice = Notice::DataSourceUnavailable(err.to_string());
                self.view.set_notice(notice);
            }
            RefreshOutcome::Discarded { .. } => {}
        }
        EventOutcome::Refreshed(outcome)
    }

    fn search(&mut self, query: &str) -> EventOutcome {
        let metric = self.store.metric();
        match self.resolver.resolve(self.source.as_ref(), query, metric) {
            Ok(measurement) => {
                self.view.clear_notice_if(|n| {
                    matches!(n, Notice::CityNotFound(_) | Notice::MissingScore(_))
                });
                EventOutcome::Navigated(self.highlight.search_succeeded(measurement))
            }
            Err(SearchError::EmptyQuery) => EventOutcome::Ignored,
            Err(err) => {
                self.highlight.search_failed();
                let notice = match err {
                    SearchError::CityNotFound(city) => Notice::CityNotFound(city),
                    SearchError::MissingScore(city) => Notice::MissingScore(city),
                    other => Notice::DataSourceUnavailable(other.to_string()),
                };
                self.view.set_notice(notice.clone());
                EventOutcome::Notified(notice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev_mode::FixtureSource;
    use crate::model::{GeoPoint, Score};
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn m(city: &str, lat: f64, lng: f64, score: f64) -> Measurement {
        Measurement::new(
            GeoPoint::new(lat, lng).unwrap(),
            Some(city.to_string()),
            BTreeMap::new(),
            Score::new(score).unwrap(),
        )
    }

    fn fixture_app() -> App {
        let source = FixtureSource::new(vec![
            m("Oslo", 59.9, 10.7, 0.1),
            m("Delhi", 28.6, 77.2, 0.9),
            m("Paris", 48.85, 2.35, 0.55),
        ]);
        App::new(Box::new(source), &Config::default())
    }

    /// Fails every call; counts search calls.
    struct Unavailable {
        searches: Rc<Cell<usize>>,
    }

    impl DataSource for Unavailable {
        fn fetch_measurements(&self, _: Metric) -> Result<Vec<Measurement>, SourceError> {
            Err(SourceError::Transport("connection refused".into()))
        }
        fn fetch_ranked(&self, _: Metric, _: usize) -> Result<Vec<Measurement>, SourceError> {
            Err(SourceError::Transport("connection refused".into()))
        }
        fn search_city(&self, _: &str, _: Metric) -> Result<Measurement, SourceError> {
            self.searches.set(self.searches.get() + 1);
            Err(SourceError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn test_start_loads_points_and_ranked_list() {
        let mut app = fixture_app();
        let outcome = app.start();
        assert_eq!(
            outcome,
            EventOutcome::Refreshed(RefreshOutcome::Applied { points: 3, ranked: 3 })
        );
        assert_eq!(app.store().ranked()[0].measurement.city(), Some("Delhi"));
    }

    #[test]
    fn test_ranked_entry_selection_highlights_that_entry() {
        let mut app = fixture_app();
        app.start();
        let outcome = app.handle(AppEvent::RankedEntrySelected(2));
        assert!(matches!(outcome, EventOutcome::Navigated(Navigation::Dropped(_))));
        assert_eq!(app.highlight().highlighted().and_then(|m| m.city()), Some("Paris"));
        assert!(!app.highlight().is_from_search());
    }

    #[test]
    fn test_unknown_rank_is_ignored() {
        let mut app = fixture_app();
        app.start();
        assert_eq!(app.handle(AppEvent::RankedEntrySelected(42)), EventOutcome::Ignored);
        assert!(app.highlight().highlighted().is_none());
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut app = fixture_app();
        assert_eq!(app.handle(AppEvent::SearchSubmitted("   ".into())), EventOutcome::Ignored);
        assert!(app.view().notice().is_none());
        assert!(app.resolver().last_query().is_none());
    }

    #[test]
    fn test_failed_search_sets_notice_and_keeps_highlight() {
        let mut app = fixture_app();
        app.start();
        app.handle(AppEvent::SearchSubmitted("Paris".into()));
        let before = app.highlight().state().clone();

        let outcome = app.handle(AppEvent::SearchSubmitted("Nowhereville".into()));

        assert_eq!(outcome, EventOutcome::Notified(Notice::CityNotFound("Nowhereville".into())));
        assert_eq!(app.highlight().state(), &before);
    }

    #[test]
    fn test_successful_search_clears_not_found_notice() {
        let mut app = fixture_app();
        app.handle(AppEvent::SearchSubmitted("Nowhereville".into()));
        assert!(app.view().notice().is_some());
        app.handle(AppEvent::SearchSubmitted("oslo".into()));
        assert!(app.view().notice().is_none());
        assert!(app.highlight().is_from_search());
    }

    #[test]
    fn test_refresh_failure_sets_unavailable_notice() {
        let searches = Rc::new(Cell::new(0));
        let mut app = App::new(
            Box::new(Unavailable {
                searches: Rc::clone(&searches),
            }),
            &Config::default(),
        );
        let outcome = app.start();
        assert!(matches!(outcome, EventOutcome::Refreshed(RefreshOutcome::Failed(_))));
        assert!(matches!(app.view().notice(), Some(Notice::DataSourceUnavailable(_))));

        let outcome = app.handle(AppEvent::SearchSubmitted("Paris".into()));
        assert!(matches!(outcome, EventOutcome::Notified(Notice::DataSourceUnavailable(_))));
        assert_eq!(searches.get(), 1);
    }

    #[test]
    fn test_dismiss_and_toggle() {
        let mut app = fixture_app();
        assert_eq!(app.handle(AppEvent::Dismissed), EventOutcome::Ignored);
        app.handle(AppEvent::PointSelected(m("Oslo", 59.9, 10.7, 0.1)));
        assert_eq!(app.handle(AppEvent::Dismissed), EventOutcome::Updated);
        assert!(app.highlight().highlighted().is_none());

        app.handle(AppEvent::ToggleRankedPanel);
        assert!(!app.view().ranked_panel_open());
    }

    #[test]
    fn test_split_refresh_discards_superseded_ticket() {
        let mut app = fixture_app();
        let first = app.begin_refresh(Metric::Composite);
        let second = app.begin_refresh(Metric::Composite);
        let late = app.fetch(&first);
        let fresh = app.fetch(&second);

        app.handle(AppEvent::RefreshCompleted { ticket: second, result: fresh });
        let outcome = app.handle(AppEvent::RefreshCompleted { ticket: first, result: late });
        assert!(matches!(outcome, EventOutcome::Refreshed(RefreshOutcome::Discarded { .. })));
    }
}
