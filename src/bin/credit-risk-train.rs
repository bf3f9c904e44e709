//! Offline training run: dataset in, preprocessor and model artifacts out.

use std::process::ExitCode;
use std::time::Instant;

use credit_risk::common::config::AppCfg;
use credit_risk::common::log;
use credit_risk::data::domain::DataRepo;
use credit_risk::data::repo_fs::FsDataRepo;
use credit_risk::training::repo_fs::FsArtifactRepo;
use credit_risk::training::service as training;
use credit_risk::RiskResult;

fn run(cfg: &AppCfg) -> RiskResult<()> {
    let start = Instant::now();
    let dataset = FsDataRepo::new(&cfg.training).load_dataset()?;
    let outcome = training::train(&cfg.training, &dataset)?;

    for candidate in &outcome.candidates {
        println!("{}\n", candidate.suite);
    }

    let repo = FsArtifactRepo::new(&cfg.artifacts);
    training::persist(&repo, &outcome)?;
    tracing::info!(
        ev = "artifacts_saved",
        model = outcome.selected.model.kind().as_str(),
        preprocessor = %repo.preprocessor_path().display(),
        model_path = %repo.model_path().display(),
        code = 0u32,
        dur_ms = start.elapsed().as_millis() as u64
    );
    Ok(())
}

fn main() -> ExitCode {
    let cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            log::init("info");
            tracing::error!(ev = "config_failed", code = err.code() as u32, error = %err);
            return ExitCode::FAILURE;
        }
    };
    log::init(&cfg.log.level);

    match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(ev = "training_failed", code = err.code() as u32, error = %err);
            ExitCode::FAILURE
        }
    }
}
