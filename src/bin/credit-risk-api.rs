//! Serving process: load the fitted artifacts once, then answer HTTP.

use std::process::ExitCode;

use credit_risk::api::{self, ApiState};
use credit_risk::common::config::AppCfg;
use credit_risk::common::log;
use credit_risk::training::repo_fs::FsArtifactRepo;
use credit_risk::{RiskError, ScoringEngine};

fn startup_failure(err: &RiskError) -> ExitCode {
    tracing::error!(ev = "startup_failed", code = err.code() as u32, error = %err);
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            log::init("info");
            return startup_failure(&err);
        }
    };
    log::init(&cfg.log.level);

    let repo = FsArtifactRepo::new(&cfg.artifacts);
    let engine = match ScoringEngine::from_repo(&repo) {
        Ok(engine) => engine,
        Err(err) => return startup_failure(&err),
    };

    let bind_addr = cfg.server.bind_addr.clone();
    if let Err(err) = api::serve(&bind_addr, ApiState::new(engine, cfg)).await {
        tracing::error!(ev = "server_failed", addr = %bind_addr, error = %err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
