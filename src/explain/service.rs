//! Ranking model importances against the pipeline's feature names.

use crate::common::error::{RiskError, RiskResult};
use crate::pipeline::domain::FittedPreprocessor;
use crate::training::domain::{Classifier, FittedModel};

use super::domain::{FeatureImportance, Ranking};

/// Pair names with importances and sort descending. A length mismatch
/// fails without returning any partial ranking.
pub fn rank(names: Vec<String>, importances: Vec<f64>) -> RiskResult<Ranking> {
    if names.len() != importances.len() {
        return Err(RiskError::FeatureCountMismatch {
            names: names.len(),
            importances: importances.len(),
        });
    }
    let mut ranking: Ranking = names
        .into_iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance { feature, importance })
        .collect();
    // sort_by is stable.
    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranking)
}

/// Ranked importances of `model` named after `preprocessor`'s layout.
pub fn feature_importance(preprocessor: &FittedPreprocessor, model: &FittedModel) -> RiskResult<Ranking> {
    rank(preprocessor.feature_names(), model.feature_importances())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_descending_with_stable_ties() {
        let ranking = rank(names(&["a", "b", "c", "d"]), vec![0.1, 0.4, 0.1, 0.4]).unwrap();
        let order: Vec<&str> = ranking.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, ["b", "d", "a", "c"]);
    }

    #[test]
    fn count_mismatch_returns_nothing() {
        let err = rank(names(&["a", "b"]), vec![1.0]).unwrap_err();
        assert!(matches!(err, RiskError::FeatureCountMismatch { names: 2, importances: 1 }));
    }

    #[test]
    fn serialises_as_feature_importance_pairs() {
        let ranking = rank(names(&["num__alter"]), vec![1.0]).unwrap();
        let json = serde_json::to_value(&ranking).unwrap();
        assert_eq!(json, serde_json::json!([{"feature": "num__alter", "importance": 1.0}]));
    }
}
