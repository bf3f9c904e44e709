//! Evaluation of candidate classifiers on a held-out split: classification
//! report, confusion matrix and ROC-AUC.

pub mod domain;
pub mod service;

pub use domain::{ClassificationReport, ConfusionMatrix, EvalSuite};
