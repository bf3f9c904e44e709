//! HTTP boundary: admission, scoring and importance reporting over axum.
//!
//! Handlers never panic on bad input. Validation failures become 422 with a
//! `detail` list, scoring failures become 400 and a broken importance
//! pairing becomes 500. Every request logs `ev`, `code` and `dur_ms`.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::common::config::AppCfg;
use crate::common::error::{RiskCode, RiskError};
use crate::data::domain::{FieldViolation, ValidationErrors, ViolationKind};
use crate::data::service as admission;
use crate::explain;
use crate::inference::domain::RiskTier;
use crate::inference::service::ScoringEngine;

pub const ROOT_MESSAGE: &str = "Credit Risk Scoring API is running";

/// Shared, read-only request state.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ScoringEngine>,
    pub cfg: Arc<AppCfg>,
}

impl ApiState {
    pub fn new(engine: ScoringEngine, cfg: AppCfg) -> Self {
        Self {
            engine: Arc::new(engine),
            cfg: Arc::new(cfg),
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    probability: f64,
    risk_tier: RiskTier,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/feature-importance", get(feature_importance))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, state: ApiState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(ev = "listening", addr = %local);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(ev = "signal_error", error = %err);
    }
    tracing::info!(ev = "shutdown");
}

async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}

async fn predict(State(state): State<ApiState>, body: Bytes) -> Response {
    let start = Instant::now();
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            log_request("predict", RiskCode::Validation, start);
            return json_invalid(&err.to_string());
        }
    };

    let record = match admission::validate_applicant(&payload) {
        Ok(record) => record,
        Err(errors) => {
            log_request("predict", RiskCode::Validation, start);
            return unprocessable(&errors);
        }
    };

    match state.engine.score(&record) {
        Ok(prediction) => {
            log_request("predict", RiskCode::Ok, start);
            Json(PredictResponse {
                probability: prediction.rounded_probability(),
                risk_tier: prediction.risk_tier,
            })
            .into_response()
        }
        Err(err) => {
            log_failure("predict", &err, start);
            error_response(StatusCode::BAD_REQUEST, &err)
        }
    }
}

async fn feature_importance(State(state): State<ApiState>) -> Response {
    let start = Instant::now();
    let ranking = match explain::feature_importance(state.engine.preprocessor(), state.engine.model()) {
        Ok(ranking) => ranking,
        Err(err) => {
            log_failure("feature_importance", &err, start);
            let status = match err {
                RiskError::FeatureCountMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            return error_response(status, &err);
        }
    };

    // The ranking is returned whether or not the chart could be written.
    let chart_ranking = ranking.clone();
    let chart_path = state.cfg.artifacts.chart_path.clone();
    match tokio::task::spawn_blocking(move || explain::render_chart(&chart_ranking, &chart_path)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(ev = "chart_render_failed", code = err.code() as u32, error = %err);
        }
        Err(err) => {
            tracing::warn!(ev = "chart_render_failed", code = RiskCode::Render as u32, error = %err);
        }
    }
    log_request("feature_importance", RiskCode::Ok, start);
    Json(ranking).into_response()
}

fn log_request(ev: &'static str, code: RiskCode, start: Instant) {
    tracing::info!(ev = ev, code = code as u32, dur_ms = start.elapsed().as_millis() as u64);
}

fn log_failure(ev: &'static str, err: &RiskError, start: Instant) {
    tracing::error!(
        ev = ev,
        code = err.code() as u32,
        dur_ms = start.elapsed().as_millis() as u64,
        error = %err
    );
}

fn error_response(status: StatusCode, err: &RiskError) -> Response {
    (status, Json(ErrorBody { error: err.to_string() })).into_response()
}

fn json_invalid(message: &str) -> Response {
    let detail = json!([{
        "type": "json_invalid",
        "loc": ["body"],
        "msg": "JSON decode error",
        "input": {},
        "ctx": { "error": message },
    }]);
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
}

fn unprocessable(errors: &ValidationErrors) -> Response {
    let detail: Vec<Value> = errors.violations.iter().map(violation_detail).collect();
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
}

fn violation_detail(v: &FieldViolation) -> Value {
    let loc = if v.field == "body" {
        json!(["body"])
    } else {
        json!(["body", v.field])
    };
    let mut detail = json!({
        "type": v.detail_type(),
        "loc": loc,
        "msg": v.message(),
        "input": v.input,
    });
    if let (ViolationKind::OutOfRange, Some(limit)) = (v.kind, v.limit) {
        let key = if v.below_min { "ge" } else { "le" };
        detail["ctx"] = json!({ key: limit });
    }
    detail
}
