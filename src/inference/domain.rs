//! Domain definitions for scoring results and risk tiers.

use serde::Serialize;

/// Upper bound (exclusive) of the LOW tier.
pub const LOW_UPPER: f64 = 0.30;
/// Upper bound (exclusive) of the MEDIUM tier.
pub const MEDIUM_UPPER: f64 = 0.60;

/// Business bucket of a default probability.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Total over `f64`: NaN fails both comparisons and lands in HIGH.
    pub fn from_probability(p: f64) -> Self {
        if p < LOW_UPPER {
            RiskTier::Low
        } else if p < MEDIUM_UPPER {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

/// Result of scoring one applicant.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// Unrounded probability of the positive class.
    pub probability: f64,
    pub risk_tier: RiskTier,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            risk_tier: RiskTier::from_probability(probability),
        }
    }

    /// Probability rounded to four decimals for the wire.
    pub fn rounded_probability(&self) -> f64 {
        (self.probability * 10_000.0).round() / 10_000.0
    }
}
