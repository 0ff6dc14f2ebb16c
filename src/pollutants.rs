//! Pollutant registry.
//!
//! Display metadata for the fixed pollutant set. This is the single source
//! of truth for pollutant display names and panel ordering; other modules
//! should read pollutants from here rather than hardcoding names.

use crate::model::Pollutant;

/// Metadata for one pollutant.
pub struct PollutantInfo {
    pub pollutant: Pollutant,
    /// Human-readable name for panels and legends.
    pub name: &'static str,
}

/// All pollutants, in the order panels list them.
pub static POLLUTANT_REGISTRY: &[PollutantInfo] = &[
    PollutantInfo {
        pollutant: Pollutant::Co,
        name: "Carbon monoxide",
    },
    PollutantInfo {
        pollutant: Pollutant::No2,
        name: "Nitrogen dioxide",
    },
    PollutantInfo {
        pollutant: Pollutant::O3,
        name: "Ozone",
    },
    PollutantInfo {
        pollutant: Pollutant::So2,
        name: "Sulphur dioxide",
    },
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
