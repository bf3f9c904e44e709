//! Shared fixtures: a seeded synthetic credit dataset and canonical payloads.
#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use credit_risk::common::config::TrainCfg;
use credit_risk::data::{Dataset, RawRow, FIELDS, FIELD_COUNT};

/// Rows before this index cycle through every contract value of every
/// categorical field, so each category is seen at fit time.
pub const CYCLE_ROWS: usize = 12;

fn value(code: &str, row: &RawRow) -> f64 {
    let idx = FIELDS.iter().position(|f| f.code == code).unwrap_or(0);
    row[idx].unwrap_or(0) as f64
}

/// Seeded dataset where default risk rises with duration and amount and
/// falls with a healthy checking account and credit history.
pub fn synthetic_dataset(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for r in 0..n {
        let row: RawRow = std::array::from_fn(|i| {
            let spec = FIELDS[i];
            if r < CYCLE_ROWS {
                let span = spec.max - spec.min + 1;
                Some(spec.min + (r as i64 % span))
            } else {
                Some(rng.random_range(spec.min..=spec.max))
            }
        });
        let score = 2.5 * (value("laufzeit", &row) - 4.0) / 68.0
            + 2.0 * (value("hoehe", &row) - 250.0) / 18174.0
            - 1.5 * (value("laufkont", &row) - 1.0) / 3.0
            - 1.0 * value("moral", &row) / 4.0;
        let noise: f64 = rng.random_range(-0.4..0.4);
        let target = if r < CYCLE_ROWS {
            (r % 2) as u8
        } else {
            u8::from(score + noise > 0.6)
        };
        rows.push(row);
        targets.push(target);
    }
    Dataset::new(rows, targets)
}

/// Small, quick training configuration.
pub fn quick_train_cfg() -> TrainCfg {
    TrainCfg {
        n_estimators: 15,
        max_depth: Some(6),
        logistic_max_iter: 300,
        ..TrainCfg::default()
    }
}

/// CSV with the field codes plus `kredit`. Cells listed in `blanks`
/// as (row, field code) are written empty.
pub fn write_csv(path: &Path, dataset: &Dataset, blanks: &[(usize, &str)]) {
    let mut out = String::new();
    let header: Vec<&str> = FIELDS.iter().map(|f| f.code).collect();
    let _ = writeln!(out, "{},kredit", header.join(","));
    for (r, (row, target)) in dataset.rows.iter().zip(&dataset.targets).enumerate() {
        let cells: Vec<String> = (0..FIELD_COUNT)
            .map(|i| {
                if blanks.iter().any(|&(br, code)| br == r && code == FIELDS[i].code) {
                    String::new()
                } else {
                    row[i].map(|v| v.to_string()).unwrap_or_default()
                }
            })
            .collect();
        let _ = writeln!(out, "{},{}", cells.join(","), target);
    }
    fs::write(path, out).unwrap();
}

fn payload(pick: impl Fn(i64, i64) -> i64) -> Value {
    let mut map = Map::new();
    for spec in FIELDS.iter() {
        map.insert(spec.code.to_string(), Value::from(pick(spec.min, spec.max)));
    }
    Value::Object(map)
}

pub fn min_payload() -> Value {
    payload(|min, _| min)
}

pub fn max_payload() -> Value {
    payload(|_, max| max)
}
