//! Severity classification of composite pollution scores.
//!
//! Submodules:
//! - `tiers`: the severity tiers, their palette, and the threshold scale.

pub mod tiers;

pub use tiers::{SeverityScale, SeverityTier, ScaleError, classify, color_of, label_of};
