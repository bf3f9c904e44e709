//! Runtime configuration: built-in defaults, an optional TOML file, then
//! environment overrides.
//!
//! The snapshot is built once at startup and handed to the components that
//! need it; nothing reads the environment after that.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::common::error::{RiskError, RiskResult};
use crate::training::domain::ModelSelection;

/// Environment variable naming the optional TOML file.
pub const CONFIG_ENV: &str = "CREDIT_RISK_CONFIG";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppCfg {
    pub artifacts: ArtifactCfg,
    pub server: ServerCfg,
    pub training: TrainCfg,
    pub log: LogCfg,
}

/// Locations of the fitted artifacts and the rendered chart.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactCfg {
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
    pub chart_path: PathBuf,
}

impl Default for ArtifactCfg {
    fn default() -> Self {
        Self {
            preprocessor_path: PathBuf::from("artifacts/preprocessor.json"),
            model_path: PathBuf::from("artifacts/model.json"),
            chart_path: PathBuf::from("artifacts/feature_importance.svg"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerCfg {
    pub bind_addr: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Offline training parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TrainCfg {
    pub dataset_path: PathBuf,
    pub target_column: String,
    pub test_size: f64,
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub logistic_max_iter: usize,
    pub logistic_c: f64,
    pub selection: ModelSelection,
}

impl Default for TrainCfg {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/credit_data.csv"),
            target_column: "kredit".to_string(),
            test_size: 0.2,
            seed: 42,
            n_estimators: 200,
            max_depth: None,
            logistic_max_iter: 1000,
            logistic_c: 1.0,
            selection: ModelSelection::RandomForest,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogCfg {
    /// `EnvFilter` directive, e.g. `info` or `credit_risk=debug`.
    pub level: String,
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppCfg {
    /// Build the snapshot from the process environment.
    pub fn load() -> RiskResult<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same layering as [`AppCfg::load`] with an injectable variable lookup.
    pub fn load_with<F>(lookup: F) -> RiskResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env(lookup);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML file; missing sections and keys keep their defaults.
    pub fn from_file(path: &Path) -> RiskResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| RiskError::io(path, err))?;
        Self::from_toml_str(&raw).map_err(|err| {
            RiskError::invalid_config(format!("{}: {err}", path.display()))
        })
    }

    pub fn from_toml_str(raw: &str) -> RiskResult<Self> {
        toml::from_str(raw).map_err(|err| RiskError::invalid_config(err.to_string()))
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CREDIT_RISK_PREPROCESSOR_PATH") {
            self.artifacts.preprocessor_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CREDIT_RISK_MODEL_PATH") {
            self.artifacts.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CREDIT_RISK_CHART_PATH") {
            self.artifacts.chart_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CREDIT_RISK_BIND") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("CREDIT_RISK_DATASET") {
            self.training.dataset_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CREDIT_RISK_LOG_LEVEL") {
            self.log.level = v;
        }
    }

    pub fn validate(&self) -> RiskResult<()> {
        let t = &self.training;
        if !(t.test_size > 0.0 && t.test_size < 1.0) {
            return Err(RiskError::invalid_config(format!(
                "training.test_size must be in (0, 1), got {}",
                t.test_size
            )));
        }
        if t.n_estimators == 0 {
            return Err(RiskError::invalid_config(
                "training.n_estimators must be at least 1",
            ));
        }
        if t.logistic_max_iter == 0 {
            return Err(RiskError::invalid_config(
                "training.logistic_max_iter must be at least 1",
            ));
        }
        if !(t.logistic_c > 0.0) {
            return Err(RiskError::invalid_config(format!(
                "training.logistic_c must be positive, got {}",
                t.logistic_c
            )));
        }
        if t.target_column.trim().is_empty() {
            return Err(RiskError::invalid_config(
                "training.target_column must not be empty",
            ));
        }
        if let Err(err) = EnvFilter::try_new(&self.log.level) {
            return Err(RiskError::invalid_config(format!(
                "log.level {:?} is not a valid filter: {err}",
                self.log.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_relative_paths() {
        let cfg = AppCfg::load_with(|_| None).unwrap();
        assert_eq!(cfg, AppCfg::default());
        assert!(cfg.artifacts.model_path.is_relative());
        assert!(cfg.artifacts.preprocessor_path.is_relative());
        assert_eq!(cfg.training.selection, ModelSelection::RandomForest);
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.toml");
        fs::write(
            &path,
            r#"
[artifacts]
model_path = "from-file/model.json"
chart_path = "from-file/chart.svg"

[training]
n_estimators = 25
selection = "best_roc_auc"
"#,
        )
        .unwrap();

        let path_str = path.to_string_lossy().to_string();
        let cfg = AppCfg::load_with(lookup_from(&[
            (CONFIG_ENV, path_str.as_str()),
            ("CREDIT_RISK_MODEL_PATH", "from-env/model.json"),
        ]))
        .unwrap();

        assert_eq!(cfg.artifacts.model_path, PathBuf::from("from-env/model.json"));
        assert_eq!(cfg.artifacts.chart_path, PathBuf::from("from-file/chart.svg"));
        assert_eq!(
            cfg.artifacts.preprocessor_path,
            PathBuf::from("artifacts/preprocessor.json")
        );
        assert_eq!(cfg.training.n_estimators, 25);
        assert_eq!(cfg.training.selection, ModelSelection::BestRocAuc);
        assert_eq!(cfg.training.seed, 42);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppCfg::from_toml_str("[server]\nport = 9000\n").unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig { .. }));
    }

    #[test]
    fn out_of_range_training_values_fail_validation() {
        let mut cfg = AppCfg::default();
        cfg.training.test_size = 1.0;
        assert!(matches!(cfg.validate(), Err(RiskError::InvalidConfig { .. })));

        let mut cfg = AppCfg::default();
        cfg.training.n_estimators = 0;
        assert!(matches!(cfg.validate(), Err(RiskError::InvalidConfig { .. })));

        let mut cfg = AppCfg::default();
        cfg.training.logistic_c = 0.0;
        assert!(matches!(cfg.validate(), Err(RiskError::InvalidConfig { .. })));
    }

    #[test]
    fn malformed_log_level_fails_validation() {
        let mut cfg = AppCfg::default();
        cfg.log.level = "credit_risk=loud".to_string();
        assert!(matches!(cfg.validate(), Err(RiskError::InvalidConfig { .. })));

        let err = AppCfg::load_with(lookup_from(&[("CREDIT_RISK_LOG_LEVEL", "info,axum=verbose")]))
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig { .. }));

        cfg.log.level = "warn,credit_risk=debug".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = AppCfg::load_with(lookup_from(&[(CONFIG_ENV, "/nonexistent/risk.toml")]))
            .unwrap_err();
        assert!(matches!(err, RiskError::Io { .. }));
    }
}
