//! Composite score → severity tier classification.
//!
//! Scores live on one normalized scale (0 = clean). The scale is cut into
//! five half-open intervals by four ascending boundaries:
//!
//!   [0, moderate) Good, [moderate, poor) Moderate, [poor, very_poor) Poor,
//!   [very_poor, severe) VeryPoor, [severe, +inf) Severe
//!
//! A score exactly on a boundary belongs to the higher tier.

use std::fmt;

use serde::Deserialize;

use crate::model::{InvalidScore, Score};

/// Severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityTier {
    Good,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 5] = [
        SeverityTier::Good,
        SeverityTier::Moderate,
        SeverityTier::Poor,
        SeverityTier::VeryPoor,
        SeverityTier::Severe,
    ];
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(label_of(*self))
    }
}

/// Display color used for points and ranked-list rows.
pub fn color_of(tier: SeverityTier) -> &'static str {
    match tier {
        SeverityTier::Good => "green",
        SeverityTier::Moderate => "yellow",
        SeverityTier::Poor => "orange",
        SeverityTier::VeryPoor => "red",
        SeverityTier::Severe => "purple",
    }
}

/// Human-readable status label.
pub fn label_of(tier: SeverityTier) -> &'static str {
    match tier {
        SeverityTier::Good => "Good",
        SeverityTier::Moderate => "Moderate",
        SeverityTier::Poor => "Poor",
        SeverityTier::VeryPoor => "Very Poor",
        SeverityTier::Severe => "Severe",
    }
}

// ---------------------------------------------------------------------------
// Threshold scale
// ---------------------------------------------------------------------------

/// Lower boundaries of every tier above `Good`.
///
/// Boundaries must be finite, positive and strictly ascending:
///   moderate < poor < very_poor < severe
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeverityScale {
    pub moderate: f64,
    pub poor: f64,
    pub very_poor: f64,
    pub severe: f64,
}

impl Default for SeverityScale {
    fn default() -> Self {
        Self {
            moderate: 0.2,
            poor: 0.4,
            very_poor: 0.6,
            severe: 0.8,
        }
    }
}

impl SeverityScale {
    pub fn new(moderate: f64, poor: f64, very_poor: f64, severe: f64) -> Result<Self, ScaleError> {
        let scale = Self {
            moderate,
            poor,
            very_poor,
            severe,
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Checks the partition invariant. Deserialized scales must pass this
    /// before use.
    pub fn validate(&self) -> Result<(), ScaleError> {
        let bounds = self.boundaries();
        for (i, value) in bounds.iter().enumerate() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(ScaleError::NonPositive {
                    tier: SeverityTier::ALL[i + 1],
                    value: *value,
                });
            }
        }
        for pair in 0..bounds.len() - 1 {
            if bounds[pair] >= bounds[pair + 1] {
                return Err(ScaleError::NotAscending {
                    lower: SeverityTier::ALL[pair + 1],
                    upper: SeverityTier::ALL[pair + 2],
                });
            }
        }
        Ok(())
    }

    fn boundaries(&self) -> [f64; 4] {
        [self.moderate, self.poor, self.very_poor, self.severe]
    }

    /// Tier for an already-validated score.
    pub fn tier_for(&self, score: Score) -> SeverityTier {
        let v = score.value();
        if v < self.moderate {
            SeverityTier::Good
        } else if v < self.poor {
            SeverityTier::Moderate
        } else if v < self.very_poor {
            SeverityTier::Poor
        } else if v < self.severe {
            SeverityTier::VeryPoor
        } else {
            SeverityTier::Severe
        }
    }

    /// Classifies a raw score. Negative or non-finite input is an
    /// `InvalidScore`.
    pub fn classify(&self, score: f64) -> Result<SeverityTier, InvalidScore> {
        Score::new(score).map(|s| self.tier_for(s))
    }

    /// Inclusive lower bound of `tier`.
    pub fn lower_bound(&self, tier: SeverityTier) -> f64 {
        match tier {
            SeverityTier::Good => 0.0,
            SeverityTier::Moderate => self.moderate,
            SeverityTier::Poor => self.poor,
            SeverityTier::VeryPoor => self.very_poor,
            SeverityTier::Severe => self.severe,
        }
    }

    /// Exclusive upper bound of `tier`; `None` for the top tier.
    pub fn upper_bound(&self, tier: SeverityTier) -> Option<f64> {
        match tier {
            SeverityTier::Good => Some(self.moderate),
            SeverityTier::Moderate => Some(self.poor),
            SeverityTier::Poor => Some(self.very_poor),
            SeverityTier::VeryPoor => Some(self.severe),
            SeverityTier::Severe => None,
        }
    }
}

/// Classifies `score` against the default scale.
pub fn classify(score: f64) -> Result<SeverityTier, InvalidScore> {
    SeverityScale::default().classify(score)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleError {
    NonPositive { tier: SeverityTier, value: f64 },
    NotAscending { lower: SeverityTier, upper: SeverityTier },
}

impl fmt::Display for ScaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleError::NonPositive { tier, value } => {
                write!(f, "Boundary for {} must be finite and positive, got {}", tier, value)
            }
            ScaleError::NotAscending { lower, upper } => {
                write!(f, "Boundary for {} must be below boundary for {}", lower, upper)
            }
        }
    }
}

impl std::error::Error for ScaleError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
