//! Highlight state machine and camera navigation.
//!
//! ```text
//! Empty          --select(m)----------> Highlighted(m, false)
//! Empty          --search_succeeded(m)-> Highlighted(m, true)
//! Highlighted(_) --select(m)----------> Highlighted(m, false)
//! Highlighted(_) --search_succeeded(m)-> Highlighted(m, true)
//! Highlighted(_) --dismiss------------> Empty
//! any            --search_failed------> unchanged
//! ```
//!
//! Entering `Highlighted` emits a one-shot navigation intent. If no camera is
//! mounted at that moment the intent is dropped; there is no retry queue.

use crate::logging::{self, Component};
use crate::model::Measurement;

/// Camera flight duration in milliseconds.
pub const FLY_DURATION_MS: u32 = 1500;

/// Camera altitude after a flight, in globe radii.
pub const FLY_ALTITUDE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOfView {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

/// "Move the camera to `target` over `duration_ms`."
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationIntent {
    pub target: PointOfView,
    pub duration_ms: u32,
}

/// The rendering surface's camera.
pub trait CameraControl {
    fn point_of_view(&mut self, target: PointOfView, duration_ms: u32);
}

/// What happened to the intent emitted by a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Navigation {
    Delivered(NavigationIntent),
    /// No camera was mounted; the intent was dropped.
    Dropped(NavigationIntent),
}

impl Navigation {
    pub fn intent(&self) -> NavigationIntent {
        match self {
            Navigation::Delivered(i) | Navigation::Dropped(i) => *i,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HighlightState {
    #[default]
    Empty,
    Highlighted {
        measurement: Measurement,
        from_search: bool,
    },
}

pub struct HighlightController {
    state: HighlightState,
    camera: Option<Box<dyn CameraControl>>,
    altitude: f64,
    duration_ms: u32,
}

impl Default for HighlightController {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightController {
    pub fn new() -> Self {
        Self::with_flight(FLY_ALTITUDE, FLY_DURATION_MS)
    }

    pub fn with_flight(altitude: f64, duration_ms: u32) -> Self {
        Self {
            state: HighlightState::Empty,
            camera: None,
            altitude,
            duration_ms,
        }
    }

    pub fn mount(&mut self, camera: Box<dyn CameraControl>) {
        self.camera = Some(camera);
    }

    pub fn unmount(&mut self) -> Option<Box<dyn CameraControl>> {
        self.camera.take()
    }

    pub fn is_mounted(&self) -> bool {
        self.camera.is_some()
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn highlighted(&self) -> Option<&Measurement> {
        match &self.state {
            HighlightState::Empty => None,
            HighlightState::Highlighted { measurement, .. } => Some(measurement),
        }
    }

    pub fn is_from_search(&self) -> bool {
        matches!(self.state, HighlightState::Highlighted { from_search: true, .. })
    }

    /// Explicit selection of a point or ranked entry.
    pub fn select(&mut self, measurement: Measurement) -> Navigation {
        self.enter(measurement, false)
    }

    pub fn search_succeeded(&mut self, measurement: Measurement) -> Navigation {
        self.enter(measurement, true)
    }

    /// A failed search leaves the current highlight exactly as it was.
    pub fn search_failed(&self) {
        logging::debug(Component::Highlight, None, "search failed; highlight unchanged");
    }

    /// Clears the highlight. Returns `false` if nothing was highlighted.
    pub fn dismiss(&mut self) -> bool {
        let was_highlighted = self.highlighted().is_some();
        self.state = HighlightState::Empty;
        was_highlighted
    }

    fn enter(&mut self, measurement: Measurement, from_search: bool) -> Navigation {
        let intent = NavigationIntent {
            target: PointOfView {
                lat: measurement.latitude(),
                lng: measurement.longitude(),
                altitude: self.altitude,
            },
            duration_ms: self.duration_ms,
        };
        self.state = HighlightState::Highlighted {
            measurement,
            from_search,
        };

        match self.camera.as_mut() {
            Some(camera) => {
                camera.point_of_view(intent.target, intent.duration_ms);
                Navigation::Delivered(intent)
            }
            None => {
                logging::debug(
                    Component::Highlight,
                    None,
                    &format!(
                        "no camera mounted; dropping navigation to ({:.2}, {:.2})",
                        intent.target.lat, intent.target.lng
                    ),
                );
                Navigation::Dropped(intent)
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
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingCamera {
        flights: Rc<RefCell<Vec<(PointOfView, u32)>>>,
    }

    impl CameraControl for RecordingCamera {
        fn point_of_view(&mut self, target: PointOfView, duration_ms: u32) {
            self.flights.borrow_mut().push((target, duration_ms));
        }
    }

    fn at(lat: f64, lng: f64) -> Measurement {
        Measurement::new(
            GeoPoint::new(lat, lng).unwrap(),
            None,
            BTreeMap::new(),
            Score::new(0.5).unwrap(),
        )
    }

    #[test]
    fn test_select_from_empty_highlights_without_search_flag() {
        let mut controller = HighlightController::new();
        controller.select(at(10.0, 20.0));
        assert_eq!(controller.highlighted(), Some(&at(10.0, 20.0)));
        assert!(!controller.is_from_search());
    }

    #[test]
    fn test_search_success_sets_search_flag() {
        let mut controller = HighlightController::new();
        controller.search_succeeded(at(48.85, 2.35));
        assert!(controller.is_from_search());
    }

    #[test]
    fn test_new_selection_replaces_previous_highlight() {
        let mut controller = HighlightController::new();
        controller.search_succeeded(at(1.0, 1.0));
        controller.select(at(2.0, 2.0));
        assert_eq!(
            controller.state(),
            &HighlightState::Highlighted {
                measurement: at(2.0, 2.0),
                from_search: false
            }
        );
    }

    #[test]
    fn test_search_failure_leaves_state_unchanged() {
        let mut controller = HighlightController::new();
        controller.select(at(5.0, 5.0));
        let before = controller.state().clone();
        controller.search_failed();
        assert_eq!(controller.state(), &before);
    }

    #[test]
    fn test_dismiss_returns_to_empty() {
        let mut controller = HighlightController::new();
        assert!(!controller.dismiss());
        controller.select(at(5.0, 5.0));
        assert!(controller.dismiss());
        assert_eq!(controller.state(), &HighlightState::Empty);
    }

    #[test]
    fn test_intent_is_delivered_to_mounted_camera() {
        let camera = RecordingCamera::default();
        let flights = Rc::clone(&camera.flights);
        let mut controller = HighlightController::new();
        controller.mount(Box::new(camera));

        let nav = controller.search_succeeded(at(48.85, 2.35));

        let expected = PointOfView {
            lat: 48.85,
            lng: 2.35,
            altitude: FLY_ALTITUDE,
        };
        assert_eq!(
            nav,
            Navigation::Delivered(NavigationIntent {
                target: expected,
                duration_ms: FLY_DURATION_MS
            })
        );
        assert_eq!(*flights.borrow(), vec![(expected, 1500u32)]);
    }

    #[test]
    fn test_intent_is_dropped_when_no_camera_is_mounted() {
        let mut controller = HighlightController::new();
        let nav = controller.select(at(3.0, 4.0));
        assert!(matches!(nav, Navigation::Dropped(_)));
        assert_eq!(nav.intent().target.lng, 4.0);
        // The highlight itself still applies.
        assert!(controller.highlighted().is_some());
    }

    #[test]
    fn test_dropped_intent_is_not_replayed_on_mount() {
        let camera = RecordingCamera::default();
        let flights = Rc::clone(&camera.flights);
        let mut controller = HighlightController::new();
        controller.select(at(3.0, 4.0));
        controller.mount(Box::new(camera));
        assert!(flights.borrow().is_empty());
    }

    #[test]
    fn test_custom_flight_parameters_are_used() {
        let mut controller = HighlightController::with_flight(1.2, 800);
        let intent = controller.select(at(0.0, 0.0)).intent();
        assert_eq!(intent.target.altitude, 1.2);
        assert_eq!(intent.duration_ms, 800);
    }
}
