//! Domain types for classifiers, model artifacts and training outcomes.

use serde::{Deserialize, Serialize};

use crate::common::error::{RiskError, RiskResult};
use crate::evaluation::domain::EvalSuite;
use crate::pipeline::domain::FittedPreprocessor;

use super::forest::RandomForest;
use super::logistic::LogisticModel;

/// Model envelope format understood by this build.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Supported classifier families.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::RandomForest => "random_forest",
        }
    }
}

/// How the training run picks the model it persists.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSelection {
    LogisticRegression,
    #[default]
    RandomForest,
    /// Highest held-out ROC-AUC; ties keep the earlier candidate.
    BestRocAuc,
}

/// A trained binary classifier.
pub trait Classifier {
    /// Input width the model was trained on.
    fn n_features(&self) -> usize;

    /// Probability of the positive class. Callers guarantee the width.
    fn predict_proba_unchecked(&self, x: &[f64]) -> f64;

    /// One non-negative score per input column, summing to 1 when any
    /// column carries signal.
    fn feature_importances(&self) -> Vec<f64>;

    /// Width-checked probability of the positive class.
    fn predict_proba(&self, x: &[f64]) -> RiskResult<f64> {
        if x.len() != self.n_features() {
            return Err(RiskError::FeatureMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        Ok(self.predict_proba_unchecked(x))
    }
}

/// Closed set of persisted model families.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    LogisticRegression(LogisticModel),
    RandomForest(RandomForest),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    /// Structural check of the model internals; failures are `ArtifactMismatch`.
    pub fn validate(&self) -> RiskResult<()> {
        let checked = match self {
            FittedModel::LogisticRegression(m) => m.validate(),
            FittedModel::RandomForest(m) => m.validate(),
        };
        checked.map_err(|details| RiskError::artifact_mismatch(format!("{} model is malformed: {details}", self.kind().as_str())))
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            FittedModel::LogisticRegression(m) => m,
            FittedModel::RandomForest(m) => m,
        }
    }
}

impl Classifier for FittedModel {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_proba_unchecked(&self, x: &[f64]) -> f64 {
        self.inner().predict_proba_unchecked(x)
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.inner().feature_importances()
    }
}

/// Persisted model envelope binding a model to its preprocessor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// SHA-256 of the preprocessor artifact the model was trained against.
    pub preprocessor_fingerprint: String,
    pub n_features: usize,
    pub model: FittedModel,
}

impl ModelArtifact {
    pub fn new(model: FittedModel, preprocessor: &FittedPreprocessor) -> RiskResult<Self> {
        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            preprocessor_fingerprint: crate::common::fingerprint::of_json(preprocessor)?,
            n_features: model.n_features(),
            model,
        })
    }

    /// Verify the envelope belongs with `preprocessor`.
    pub fn check_against(&self, preprocessor: &FittedPreprocessor) -> RiskResult<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(RiskError::artifact_mismatch(format!(
                "model format {} is not supported (expected {})",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        self.model.validate()?;
        let fingerprint = crate::common::fingerprint::of_json(preprocessor)?;
        if fingerprint != self.preprocessor_fingerprint {
            return Err(RiskError::artifact_mismatch(format!(
                "model was trained against preprocessor {}, loaded preprocessor is {}",
                self.preprocessor_fingerprint, fingerprint
            )));
        }
        let width = preprocessor.output_width();
        if self.n_features != width || self.model.n_features() != width {
            return Err(RiskError::artifact_mismatch(format!(
                "model expects {} features, preprocessor produces {}",
                self.model.n_features(),
                width
            )));
        }
        Ok(())
    }
}

/// Repository contract for the fitted artifacts.
pub trait ArtifactRepo {
    fn put_preprocessor(&self, preprocessor: &FittedPreprocessor) -> RiskResult<()>;
    fn get_preprocessor(&self) -> RiskResult<FittedPreprocessor>;
    fn put_model(&self, artifact: &ModelArtifact) -> RiskResult<()>;
    fn get_model(&self) -> RiskResult<ModelArtifact>;
}

/// A trained candidate with its held-out evaluation.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub model: FittedModel,
    pub suite: EvalSuite,
}

/// Everything a training run produces.
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub preprocessor: FittedPreprocessor,
    pub candidates: Vec<Candidate>,
    pub selected: ModelArtifact,
}
