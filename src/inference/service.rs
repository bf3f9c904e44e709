//! Online scoring over the fitted artifacts.
//!
//! A `ScoringEngine` is built once at startup and then only read, so one
//! instance behind an `Arc` serves every request without locks.

use std::time::Instant;

use crate::common::error::RiskResult;
use crate::data::domain::ApplicantRecord;
use crate::pipeline::domain::FittedPreprocessor;
use crate::training::domain::{ArtifactRepo, Classifier, FittedModel, ModelArtifact};

use super::domain::Prediction;

/// Fitted preprocessor and model paired for scoring.
#[derive(Clone, Debug)]
pub struct ScoringEngine {
    preprocessor: FittedPreprocessor,
    model: FittedModel,
}

impl ScoringEngine {
    /// Pair the artifacts without cross-checking them. Width drift then
    /// surfaces per call as `FeatureMismatch`.
    pub fn from_parts(preprocessor: FittedPreprocessor, model: FittedModel) -> Self {
        Self { preprocessor, model }
    }

    /// Pair the artifacts after verifying the envelope binds to this
    /// preprocessor.
    pub fn from_artifacts(preprocessor: FittedPreprocessor, artifact: ModelArtifact) -> RiskResult<Self> {
        preprocessor.check_compatible()?;
        artifact.check_against(&preprocessor)?;
        Ok(Self::from_parts(preprocessor, artifact.model))
    }

    /// Load and verify both artifacts from `repo`.
    pub fn from_repo(repo: &dyn ArtifactRepo) -> RiskResult<Self> {
        let start = Instant::now();
        let preprocessor = repo.get_preprocessor()?;
        let artifact = repo.get_model()?;
        let engine = Self::from_artifacts(preprocessor, artifact)?;
        tracing::info!(
            ev = "artifacts_loaded",
            model = engine.model.kind().as_str(),
            width = engine.preprocessor.output_width(),
            code = 0u32,
            dur_ms = start.elapsed().as_millis() as u64
        );
        Ok(engine)
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    /// Probability of default for one admitted applicant.
    pub fn probability(&self, record: &ApplicantRecord) -> RiskResult<f64> {
        let x = self.preprocessor.transform_record(record)?;
        self.model.predict_proba(&x)
    }

    pub fn score(&self, record: &ApplicantRecord) -> RiskResult<Prediction> {
        self.probability(record).map(Prediction::from_probability)
    }

    /// Score each record independently. The first failure fails the batch.
    pub fn score_batch(&self, records: &[ApplicantRecord]) -> RiskResult<Vec<Prediction>> {
        records.iter().map(|r| self.score(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::RiskError;
    use crate::data::domain::{RawRow, FIELDS};
    use crate::data::service::applicant_from_values;
    use crate::pipeline;
    use crate::training::forest::{DecisionTree, Node, RandomForest};
    use crate::training::logistic::LogisticModel;

    fn rows() -> Vec<RawRow> {
        (0..30)
            .map(|r| std::array::from_fn(|i| Some(FIELDS[i].min + (r as i64 % (FIELDS[i].max - FIELDS[i].min + 1).min(6)))))
            .collect()
    }

    fn min_record() -> ApplicantRecord {
        applicant_from_values(std::array::from_fn(|i| FIELDS[i].min)).unwrap()
    }

    #[test]
    fn scores_are_deterministic_and_bounded() {
        let pre = pipeline::fit(&rows()).unwrap();
        let width = pre.output_width();
        let model = FittedModel::LogisticRegression(LogisticModel {
            weights: (0..width).map(|i| (i as f64 - 10.0) / 50.0).collect(),
            intercept: -0.2,
        });
        let engine = ScoringEngine::from_parts(pre, model);
        let a = engine.score(&min_record()).unwrap();
        let b = engine.score(&min_record()).unwrap();
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
        assert!((0.0..=1.0).contains(&a.probability));
        assert_eq!(engine.score_batch(&[min_record(), min_record()]).unwrap(), vec![a, a]);
    }

    #[test]
    fn width_drift_is_a_feature_mismatch() {
        let pre = pipeline::fit(&rows()).unwrap();
        let model = FittedModel::LogisticRegression(LogisticModel {
            weights: vec![0.1; 3],
            intercept: 0.0,
        });
        let engine = ScoringEngine::from_parts(pre, model);
        assert!(matches!(
            engine.score(&min_record()),
            Err(RiskError::FeatureMismatch { actual, expected: 3 }) if actual > 3
        ));
    }

    fn forest_artifact(pre: &FittedPreprocessor, trees: Vec<DecisionTree>) -> ModelArtifact {
        let width = pre.output_width();
        let model = FittedModel::RandomForest(RandomForest {
            n_features: width,
            trees,
            importances: vec![0.0; width],
        });
        ModelArtifact::new(model, pre).unwrap()
    }

    #[test]
    fn malformed_forest_is_rejected_at_load() {
        let pre = pipeline::fit(&rows()).unwrap();
        let bad_split = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 9999,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { proba: 0.2 },
                Node::Leaf { proba: 0.8 },
            ],
        };
        let artifact = forest_artifact(&pre, vec![bad_split]);
        assert!(matches!(
            ScoringEngine::from_artifacts(pre.clone(), artifact),
            Err(RiskError::ArtifactMismatch { .. })
        ));

        let empty = forest_artifact(&pre, vec![]);
        assert!(matches!(
            ScoringEngine::from_artifacts(pre, empty),
            Err(RiskError::ArtifactMismatch { .. })
        ));
    }

    #[test]
    fn foreign_envelope_is_rejected() {
        let pre = pipeline::fit(&rows()).unwrap();
        let other = pipeline::fit(&rows()[..12]).unwrap();
        let model = FittedModel::LogisticRegression(LogisticModel {
            weights: vec![0.0; other.output_width()],
            intercept: 0.0,
        });
        let artifact = ModelArtifact::new(model, &other).unwrap();
        assert!(matches!(
            ScoringEngine::from_artifacts(pre, artifact),
            Err(RiskError::ArtifactMismatch { .. })
        ));
    }
}
