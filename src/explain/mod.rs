//! Explainability: ranked feature importances and their chart.

pub mod chart;
pub mod domain;
pub mod service;

pub use chart::render_chart;
pub use domain::{FeatureImportance, Ranking};
pub use service::{feature_importance, rank};
