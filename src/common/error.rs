//! Error handling primitives shared across the core.
//!
//! Every failure carries a stable numeric code (see [`RiskCode`]) that is
//! emitted in structured log lines, plus a `[CR-xxxx]` prefixed message.

use std::path::PathBuf;

use thiserror::Error;

use crate::data::domain::ValidationErrors;

/// Stable error codes used in log lines and error bodies.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RiskCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Applicant record failed the field contract.
    Validation = 1,
    /// Feature vector width disagrees with the model.
    FeatureMismatch = 2,
    /// Importance names and values are misaligned.
    FeatureCountMismatch = 3,
    /// Chart rendering failed.
    Render = 4,
    /// Ordinal category never seen at fit time.
    UnknownCategory = 5,
    /// Preprocessor and model artifacts do not belong together.
    ArtifactMismatch = 6,
    /// Configuration failed to parse or validate.
    InvalidConfig = 7,
    /// Dataset unreadable or unusable for fitting.
    Dataset = 8,
    /// Candidate training failed.
    Training = 9,
    /// Artifact (de)serialisation failure.
    Serialization = 10,
    /// Filesystem failure.
    Io = 11,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("[CR-1001] applicant failed validation: {0}")]
    Validation(ValidationErrors),

    #[error("[CR-2001] feature mismatch: model expects {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("[CR-2002] feature count mismatch: {names} names vs {importances} importances")]
    FeatureCountMismatch { names: usize, importances: usize },

    #[error("[CR-2003] unknown category {value} for ordinal field {field}")]
    UnknownCategory { field: String, value: i64 },

    #[error("[CR-2004] artifact mismatch: {details}")]
    ArtifactMismatch { details: String },

    #[error("[CR-3001] chart rendering failed for {path}: {details}")]
    Render { path: PathBuf, details: String },

    #[error("[CR-4001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CR-4002] dataset error: {details}")]
    Dataset { details: String },

    #[error("[CR-4003] training failed: {details}")]
    Training { details: String },

    #[error("[CR-5001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CR-5002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the crate.
pub type RiskResult<T> = Result<T, RiskError>;

impl RiskError {
    /// Stable machine-parseable code.
    pub const fn code(&self) -> RiskCode {
        match self {
            Self::Validation(_) => RiskCode::Validation,
            Self::FeatureMismatch { .. } => RiskCode::FeatureMismatch,
            Self::FeatureCountMismatch { .. } => RiskCode::FeatureCountMismatch,
            Self::UnknownCategory { .. } => RiskCode::UnknownCategory,
            Self::ArtifactMismatch { .. } => RiskCode::ArtifactMismatch,
            Self::Render { .. } => RiskCode::Render,
            Self::InvalidConfig { .. } => RiskCode::InvalidConfig,
            Self::Dataset { .. } => RiskCode::Dataset,
            Self::Training { .. } => RiskCode::Training,
            Self::Serialization { .. } => RiskCode::Serialization,
            Self::Io { .. } => RiskCode::Io,
        }
    }

    /// IO helper that keeps the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Serde helper.
    pub fn serialization(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            context,
            details: err.to_string(),
        }
    }

    pub fn dataset(details: impl Into<String>) -> Self {
        Self::Dataset {
            details: details.into(),
        }
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    pub fn artifact_mismatch(details: impl Into<String>) -> Self {
        Self::ArtifactMismatch {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RiskCode::Ok as u32, 0);
        assert_eq!(RiskCode::Validation as u32, 1);
        assert_eq!(RiskCode::FeatureMismatch as u32, 2);
        assert_eq!(RiskCode::FeatureCountMismatch as u32, 3);
        assert_eq!(RiskCode::Render as u32, 4);
        assert_eq!(RiskCode::UnknownCategory as u32, 5);
        assert_eq!(RiskCode::ArtifactMismatch as u32, 6);
        assert_eq!(RiskCode::InvalidConfig as u32, 7);
        assert_eq!(RiskCode::Dataset as u32, 8);
        assert_eq!(RiskCode::Training as u32, 9);
        assert_eq!(RiskCode::Serialization as u32, 10);
        assert_eq!(RiskCode::Io as u32, 11);
    }

    #[test]
    fn messages_carry_prefix_and_counts() {
        let err = RiskError::FeatureCountMismatch {
            names: 3,
            importances: 5,
        };
        assert_eq!(err.code(), RiskCode::FeatureCountMismatch);
        assert_eq!(
            err.to_string(),
            "[CR-2002] feature count mismatch: 3 names vs 5 importances"
        );
    }
}
