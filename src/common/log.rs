//! Structured logging emitting one JSON object per line.
//!
//! Call sites attach the documented fields: `ev` (event name), `code` (a
//! [`RiskCode`](crate::common::error::RiskCode) as `u32`, 0 on success) and
//! `dur_ms` where a duration is meaningful.

use tracing_subscriber::EnvFilter;

/// Install the global JSON subscriber. Later calls are no-ops.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(true)
        .try_init();
}
