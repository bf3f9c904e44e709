//! Training domain: classifier families, the offline training run and
//! artifact persistence.

pub mod domain;
pub mod forest;
pub mod logistic;
pub mod repo_fs;
pub mod service;

pub use domain::{Classifier, FittedModel, ModelArtifact, ModelKind, ModelSelection};
