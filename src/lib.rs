//! Credit risk scoring: applicant contract, preprocessing, classifiers,
//! explainability and the HTTP boundary.
pub mod common;
pub mod data;
pub mod pipeline;
pub mod training;
pub mod inference;
pub mod evaluation;
pub mod explain;
pub mod api;

pub use common::{RiskCode, RiskError, RiskResult};
pub use inference::{Prediction, RiskTier, ScoringEngine};
