//! Preprocessing pipeline: per-group imputation, scaling and encoding from a
//! raw applicant row to the fixed-width vector the classifiers consume.

pub mod domain;
pub mod service;

pub use domain::{FeatureGroup, FittedPreprocessor};
pub use service::fit;
