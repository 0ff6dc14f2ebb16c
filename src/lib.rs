//! AirLens client core.
//!
//! Loads air-quality measurements from the AirLens API, classifies them into
//! severity tiers, tracks the highlighted location, and produces the render
//! state for a 3D globe.

pub mod app;
pub mod classify;
pub mod config;
pub mod dev_mode;
pub mod highlight;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pollutants;
pub mod search;
pub mod store;
pub mod verify;
pub mod view;
