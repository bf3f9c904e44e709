//! Offline training run: fit the preprocessor, train both candidates on a
//! stratified split, evaluate them and select the model to persist.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::common::config::TrainCfg;
use crate::common::error::{RiskError, RiskResult};
use crate::data::domain::Dataset;
use crate::evaluation::service as evaluation_service;
use crate::pipeline;

use super::domain::{
    ArtifactRepo, Candidate, FittedModel, ModelArtifact, ModelKind, ModelSelection,
    TrainingOutcome,
};
use super::forest::{ForestParams, RandomForest};
use super::logistic::{LogisticModel, LogisticParams};

/// Row indices of a train/test split.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded split that keeps the class ratio in both halves. Each class with
/// at least two rows contributes at least one row to each side.
pub fn stratified_split(targets: &[u8], test_size: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::new(),
        test: Vec::new(),
    };
    for class in [0u8, 1u8] {
        let mut idx: Vec<usize> = (0..targets.len()).filter(|&i| targets[i] == class).collect();
        idx.shuffle(&mut rng);
        let n = idx.len();
        let mut n_test = (n as f64 * test_size).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        }
        split.test.extend_from_slice(&idx[..n_test.min(n)]);
        split.train.extend_from_slice(&idx[n_test.min(n)..]);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}

fn gather<T: Clone>(items: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| items[i].clone()).collect()
}

/// Run the whole offline pipeline on `dataset`.
pub fn train(cfg: &TrainCfg, dataset: &Dataset) -> RiskResult<TrainingOutcome> {
    if dataset.rows.len() != dataset.targets.len() {
        return Err(RiskError::dataset("rows and targets differ in length"));
    }
    let preprocessor = pipeline::fit(&dataset.rows)?;
    let x = preprocessor.transform_batch(&dataset.rows)?;

    let split = stratified_split(&dataset.targets, cfg.test_size, cfg.seed);
    let x_train = gather(&x, &split.train);
    let y_train = gather(&dataset.targets, &split.train);
    let x_test = gather(&x, &split.test);
    let y_test = gather(&dataset.targets, &split.test);
    if !(y_train.contains(&0) && y_train.contains(&1)) {
        return Err(RiskError::Training {
            details: "training split must contain both classes".to_string(),
        });
    }
    tracing::info!(
        ev = "split",
        train = split.train.len(),
        test = split.test.len(),
        width = preprocessor.output_width()
    );

    let mut candidates = Vec::with_capacity(2);
    for kind in [ModelKind::LogisticRegression, ModelKind::RandomForest] {
        let start = Instant::now();
        let model = fit_candidate(kind, cfg, &x_train, &y_train)?;
        let suite = evaluation_service::evaluate(&model, &x_test, &y_test)?;
        tracing::info!(
            ev = "candidate_trained",
            model = kind.as_str(),
            roc_auc = suite.roc_auc.unwrap_or(f64::NAN),
            accuracy = suite.report.accuracy,
            code = 0u32,
            dur_ms = start.elapsed().as_millis() as u64
        );
        candidates.push(Candidate { model, suite });
    }

    let chosen = select(&candidates, cfg.selection)?;
    let selected = ModelArtifact::new(chosen.model.clone(), &preprocessor)?;
    tracing::info!(ev = "model_selected", model = chosen.suite.model.as_str());

    Ok(TrainingOutcome {
        preprocessor,
        candidates,
        selected,
    })
}

fn fit_candidate(kind: ModelKind, cfg: &TrainCfg, x: &[Vec<f64>], y: &[u8]) -> RiskResult<FittedModel> {
    match kind {
        ModelKind::LogisticRegression => {
            let params = LogisticParams {
                c: cfg.logistic_c,
                max_iter: cfg.logistic_max_iter,
                ..LogisticParams::default()
            };
            LogisticModel::fit(x, y, &params).map(FittedModel::LogisticRegression)
        }
        ModelKind::RandomForest => {
            let params = ForestParams {
                n_estimators: cfg.n_estimators,
                max_depth: cfg.max_depth,
                seed: cfg.seed,
                ..ForestParams::default()
            };
            RandomForest::fit(x, y, &params).map(FittedModel::RandomForest)
        }
    }
}

fn select(candidates: &[Candidate], selection: ModelSelection) -> RiskResult<&Candidate> {
    let by_kind = |kind: ModelKind| {
        candidates
            .iter()
            .find(|c| c.suite.model == kind)
            .ok_or_else(|| RiskError::Training {
                details: format!("no {} candidate was trained", kind.as_str()),
            })
    };
    match selection {
        ModelSelection::LogisticRegression => by_kind(ModelKind::LogisticRegression),
        ModelSelection::RandomForest => by_kind(ModelKind::RandomForest),
        ModelSelection::BestRocAuc => {
            let mut best: Option<&Candidate> = None;
            for c in candidates {
                let auc = c.suite.roc_auc.unwrap_or(f64::NEG_INFINITY);
                let current = best.map_or(f64::NEG_INFINITY, |b| b.suite.roc_auc.unwrap_or(f64::NEG_INFINITY));
                if best.is_none() || auc > current {
                    best = Some(c);
                }
            }
            best.ok_or_else(|| RiskError::Training {
                details: "no candidates were trained".to_string(),
            })
        }
    }
}

/// Write both artifacts. The preprocessor goes first so a model never
/// lands next to a stale preprocessor it does not match.
pub fn persist(repo: &dyn ArtifactRepo, outcome: &TrainingOutcome) -> RiskResult<()> {
    repo.put_preprocessor(&outcome.preprocessor)?;
    repo.put_model(&outcome.selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_stratified_and_seeded() {
        let targets: Vec<u8> = (0..100).map(|i| u8::from(i % 4 == 0)).collect();
        let a = stratified_split(&targets, 0.2, 42);
        let b = stratified_split(&targets, 0.2, 42);
        assert_eq!(a, b);
        assert_eq!(a.test.len(), 20);
        assert_eq!(a.train.len(), 80);
        let test_pos = a.test.iter().filter(|&&i| targets[i] == 1).count();
        assert_eq!(test_pos, 5);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_classes_land_on_both_sides() {
        let targets = [0, 0, 0, 0, 0, 1, 1];
        let split = stratified_split(&targets, 0.2, 7);
        assert!(split.test.iter().any(|&i| targets[i] == 1));
        assert!(split.train.iter().any(|&i| targets[i] == 1));
    }
}
