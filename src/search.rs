//! City search.
//!
//! Resolves a free-text city name to a single measurement. Blank queries are
//! rejected before anything reaches the data source; source failures are
//! converted here so nothing downstream ever sees a `SourceError`.

use std::fmt;

use crate::ingest::{DataSource, SourceError};
use crate::logging::{self, Component};
use crate::model::{Measurement, Metric, RecordError};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Empty or whitespace-only query; no request was made.
    EmptyQuery,
    /// The data source could not locate the city.
    CityNotFound(String),
    /// The city was found but the source had no composite value for it.
    MissingScore(String),
    DataSourceUnavailable(SourceError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::EmptyQuery => write!(f, "Search query is empty"),
            SearchError::CityNotFound(city) => write!(f, "City not found: {}", city),
            SearchError::MissingScore(city) => write!(f, "No pollution score available for {}", city),
            SearchError::DataSourceUnavailable(e) => write!(f, "Data source unavailable: {}", e),
        }
    }
}

impl std::error::Error for SearchError {}

/// Trims `query`, rejecting it if nothing is left.
pub fn normalize_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(SearchError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResolver {
    last_query: Option<String>,
}

impl SearchResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last query actually sent to the data source.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn resolve(
        &mut self,
        source: &dyn DataSource,
        query: &str,
        metric: Metric,
    ) -> Result<Measurement, SearchError> {
        let city = normalize_query(query)?;
        self.last_query = Some(city.to_string());

        match source.search_city(city, metric) {
            Ok(found) => {
                logging::info(
                    Component::Search,
                    Some(city),
                    &format!("resolved to ({:.2}, {:.2})", found.latitude(), found.longitude()),
                );
                // The panel heading needs a name even if the source omits one.
                if found.city().is_none() {
                    Ok(found.with_city(city))
                } else {
                    Ok(found)
                }
            }
            Err(SourceError::NotFound(_)) => {
                logging::info(Component::Search, Some(city), "city not found");
                Err(SearchError::CityNotFound(city.to_string()))
            }
            Err(SourceError::InvalidRecord(RecordError::MissingScore)) => {
                logging::warn(Component::Search, Some(city), "match has no composite score");
                Err(SearchError::MissingScore(city.to_string()))
            }
            Err(e) => {
                logging::log_source_failure(Component::Search, Some(city), "search", &e);
                Err(SearchError::DataSourceUnavailable(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeoPoint, Score};
    use std::cell::Cell;
    use std::collections::BTreeMap;

    /// Answers every search with a fixed result and counts calls.
    struct Scripted {
        answer: Result<Measurement, SourceError>,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn new(answer: Result<Measurement, SourceError>) -> Self {
            Self {
                answer,
                calls: Cell::new(0),
            }
        }
    }

    impl DataSource for Scripted {
        fn fetch_measurements(&self, _: Metric) -> Result<Vec<Measurement>, SourceError> {
            Ok(Vec::new())
        }

        fn fetch_ranked(&self, _: Metric, _: usize) -> Result<Vec<Measurement>, SourceError> {
            Ok(Vec::new())
        }

        fn search_city(&self, _: &str, _: Metric) -> Result<Measurement, SourceError> {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
    }

    fn paris(city: Option<&str>) -> Measurement {
        Measurement::new(
            GeoPoint::new(48.85, 2.35).unwrap(),
            city.map(String::from),
            BTreeMap::new(),
            Score::new(0.55).unwrap(),
        )
    }

    #[test]
    fn test_whitespace_query_never_reaches_the_source() {
        let source = Scripted::new(Ok(paris(Some("Paris"))));
        let mut resolver = SearchResolver::new();
        assert_eq!(
            resolver.resolve(&source, "   \t", Metric::Composite),
            Err(SearchError::EmptyQuery)
        );
        assert_eq!(resolver.resolve(&source, "", Metric::Composite), Err(SearchError::EmptyQuery));
        assert_eq!(source.calls.get(), 0);
        assert_eq!(resolver.last_query(), None);
    }

    #[test]
    fn test_query_is_trimmed_before_sending() {
        let source = Scripted::new(Ok(paris(Some("Paris"))));
        let mut resolver = SearchResolver::new();
        let found = resolver.resolve(&source, "  Paris ", Metric::Composite).unwrap();
        assert_eq!(found.city(), Some("Paris"));
        assert_eq!(resolver.last_query(), Some("Paris"));
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_not_found_becomes_city_not_found() {
        let source = Scripted::new(Err(SourceError::NotFound("City not found".into())));
        let mut resolver = SearchResolver::new();
        assert_eq!(
            resolver.resolve(&source, "Nowhereville", Metric::Composite),
            Err(SearchError::CityNotFound("Nowhereville".into()))
        );
    }

    #[test]
    fn test_missing_score_is_surfaced_not_defaulted() {
        let source = Scripted::new(Err(SourceError::InvalidRecord(RecordError::MissingScore)));
        let mut resolver = SearchResolver::new();
        assert_eq!(
            resolver.resolve(&source, "Paris", Metric::Composite),
            Err(SearchError::MissingScore("Paris".into()))
        );
    }

    #[test]
    fn test_transport_failure_becomes_data_source_unavailable() {
        let source = Scripted::new(Err(SourceError::Transport("connection refused".into())));
        let mut resolver = SearchResolver::new();
        assert!(matches!(
            resolver.resolve(&source, "Paris", Metric::Composite),
            Err(SearchError::DataSourceUnavailable(SourceError::Transport(_)))
        ));
    }

    #[test]
    fn test_unnamed_match_takes_the_query_as_its_name() {
        let source = Scripted::new(Ok(paris(None)));
        let mut resolver = SearchResolver::new();
        let found = resolver.resolve(&source, "Paris", Metric::Composite).unwrap();
        assert_eq!(found.city(), Some("Paris"));
        assert_eq!(found.longitude(), 2.35);
    }
}
