//! Shared utilities that glue the different domains together.
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod log;

pub use error::{RiskCode, RiskError, RiskResult};
