//! Filesystem repository for the fitted preprocessor and model envelope.
//!
//! Both artifacts are pretty-printed JSON. Writes go to a sibling temp file
//! first and are renamed into place, so a reader never sees a torn artifact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::config::ArtifactCfg;
use crate::common::error::{RiskError, RiskResult};
use crate::pipeline::domain::FittedPreprocessor;

use super::domain::{ArtifactRepo, ModelArtifact};

/// Artifact paths come from configuration; nothing here is hardcoded.
pub struct FsArtifactRepo {
    preprocessor_path: PathBuf,
    model_path: PathBuf,
}

impl FsArtifactRepo {
    pub fn new(cfg: &ArtifactCfg) -> Self {
        Self {
            preprocessor_path: cfg.preprocessor_path.clone(),
            model_path: cfg.model_path.clone(),
        }
    }

    pub fn preprocessor_path(&self) -> &Path {
        &self.preprocessor_path
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, context: &'static str) -> RiskResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| RiskError::io(parent, err))?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| RiskError::serialization(context, err))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|err| RiskError::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| RiskError::io(path, err))
}

fn read_json<T: DeserializeOwned>(path: &Path, context: &'static str) -> RiskResult<T> {
    let bytes = fs::read(path).map_err(|err| RiskError::io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| RiskError::serialization(context, err))
}

impl ArtifactRepo for FsArtifactRepo {
    fn put_preprocessor(&self, preprocessor: &FittedPreprocessor) -> RiskResult<()> {
        write_json(&self.preprocessor_path, preprocessor, "preprocessor artifact")
    }

    fn get_preprocessor(&self) -> RiskResult<FittedPreprocessor> {
        read_json(&self.preprocessor_path, "preprocessor artifact")
    }

    fn put_model(&self, artifact: &ModelArtifact) -> RiskResult<()> {
        write_json(&self.model_path, artifact, "model artifact")
    }

    fn get_model(&self) -> RiskResult<ModelArtifact> {
        read_json(&self.model_path, "model artifact")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::domain::FittedModel;
    use crate::training::logistic::LogisticModel;

    #[test]
    fn missing_artifacts_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsArtifactRepo::new(&ArtifactCfg {
            preprocessor_path: dir.path().join("pre.json"),
            model_path: dir.path().join("model.json"),
            chart_path: dir.path().join("chart.svg"),
        });
        assert!(matches!(repo.get_preprocessor(), Err(RiskError::Io { .. })));
        assert!(matches!(repo.get_model(), Err(RiskError::Io { .. })));
    }

    #[test]
    fn corrupt_model_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("nested").join("model.json");
        let repo = FsArtifactRepo::new(&ArtifactCfg {
            preprocessor_path: dir.path().join("pre.json"),
            model_path: model_path.clone(),
            chart_path: dir.path().join("chart.svg"),
        });
        let artifact = ModelArtifact {
            format_version: 1,
            preprocessor_fingerprint: "abc".into(),
            n_features: 1,
            model: FittedModel::LogisticRegression(LogisticModel {
                weights: vec![0.5],
                intercept: -0.1,
            }),
        };
        repo.put_model(&artifact).unwrap();
        assert_eq!(repo.get_model().unwrap(), artifact);

        fs::write(&model_path, b"{\"format_version\": 1").unwrap();
        assert!(matches!(repo.get_model(), Err(RiskError::Serialization { .. })));
    }
}
