//! Domain types for ranked feature importances.

use serde::Serialize;

/// One ranked feature on the wire: `{"feature", "importance"}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Importances in descending order; ties keep layout order.
pub type Ranking = Vec<FeatureImportance>;
