//! Online scoring: the shared engine and risk tiers.

pub mod domain;
pub mod service;

pub use domain::{Prediction, RiskTier};
pub use service::ScoringEngine;
