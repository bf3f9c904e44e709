//! Fitting and applying the preprocessing pipeline.
//!
//! `fit` runs once, offline, over the full historical dataset. `transform`
//! is a pure function of one row and the fitted parameters, so it is safe to
//! call concurrently on a shared preprocessor.

use std::collections::BTreeMap;

use crate::common::error::{RiskError, RiskResult};
use crate::data::domain::{field_index, ApplicantRecord, RawRow};

use super::domain::{
    CategoricalColumn, FeatureGroup, FittedPreprocessor, NumericColumn,
    PREPROCESSOR_FORMAT_VERSION,
};

/// Learn imputation statistics and encodings for every group.
pub fn fit(rows: &[RawRow]) -> RiskResult<FittedPreprocessor> {
    if rows.is_empty() {
        return Err(RiskError::dataset("cannot fit the preprocessor on an empty dataset"));
    }

    let numeric = FeatureGroup::Numeric
        .fields()
        .iter()
        .map(|code| fit_numeric(code, &observed(rows, code)?, rows.len()))
        .collect::<RiskResult<Vec<_>>>()?;
    let ordinal = FeatureGroup::Ordinal
        .fields()
        .iter()
        .map(|code| fit_categorical(code, &observed(rows, code)?, rows.len()))
        .collect::<RiskResult<Vec<_>>>()?;
    let nominal = FeatureGroup::Nominal
        .fields()
        .iter()
        .map(|code| fit_categorical(code, &observed(rows, code)?, rows.len()))
        .collect::<RiskResult<Vec<_>>>()?;

    let fitted = FittedPreprocessor {
        format_version: PREPROCESSOR_FORMAT_VERSION,
        n_samples: rows.len(),
        numeric,
        ordinal,
        nominal,
    };
    tracing::info!(
        ev = "preprocessor_fit",
        rows = rows.len(),
        width = fitted.output_width()
    );
    Ok(fitted)
}

/// Non-missing values of one column. A column with none cannot be imputed.
fn observed(rows: &[RawRow], code: &str) -> RiskResult<Vec<i64>> {
    let idx = resolve(code)?;
    let values: Vec<i64> = rows.iter().filter_map(|row| row[idx]).collect();
    if values.is_empty() {
        return Err(RiskError::dataset(format!("column {code} has no observed values")));
    }
    Ok(values)
}

fn fit_numeric(code: &str, observed: &[i64], n_rows: usize) -> RiskResult<NumericColumn> {
    let median = median(observed);
    // Scaler statistics are taken after imputation: missing cells count as the median.
    let missing = (n_rows - observed.len()) as f64;
    let n = n_rows as f64;
    let mean = (observed.iter().map(|&v| v as f64).sum::<f64>() + missing * median) / n;
    let var = (observed
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        + missing * (median - mean).powi(2))
        / n;
    let std = var.sqrt();
    Ok(NumericColumn {
        field: code.to_string(),
        median,
        mean,
        scale: if std > 0.0 { std } else { 1.0 },
    })
}

fn fit_categorical(code: &str, observed: &[i64], n_rows: usize) -> RiskResult<CategoricalColumn> {
    let most_frequent = most_frequent(observed);
    let mut categories: Vec<i64> = observed.to_vec();
    if observed.len() < n_rows {
        categories.push(most_frequent);
    }
    categories.sort_unstable();
    categories.dedup();
    Ok(CategoricalColumn {
        field: code.to_string(),
        most_frequent,
        categories,
    })
}

fn median(values: &[i64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Highest count wins; ties go to the smallest value.
fn most_frequent(values: &[i64]) -> i64 {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best = (values[0], 0usize);
    for (value, count) in counts {
        if count > best.1 {
            best = (value, count);
        }
    }
    best.0
}

fn resolve(code: &str) -> RiskResult<usize> {
    field_index(code)
        .ok_or_else(|| RiskError::artifact_mismatch(format!("unknown field {code} in preprocessor")))
}

impl FittedPreprocessor {
    /// Transform one raw row into the fixed-width feature vector.
    ///
    /// Unseen nominal categories produce an all-zero indicator block for
    /// that field. This is a deliberate robustness policy for one-hot
    /// columns only: an unseen ordinal category has no meaningful code and
    /// fails with `UnknownCategory`.
    pub fn transform(&self, row: &RawRow) -> RiskResult<Vec<f64>> {
        let mut out = Vec::with_capacity(self.output_width());

        for col in &self.numeric {
            let value = row[resolve(&col.field)?].map_or(col.median, |v| v as f64);
            out.push((value - col.mean) / col.scale);
        }

        for col in &self.ordinal {
            let value = row[resolve(&col.field)?].unwrap_or(col.most_frequent);
            let code = col.code_of(value).ok_or_else(|| RiskError::UnknownCategory {
                field: col.field.clone(),
                value,
            })?;
            out.push(code as f64);
        }

        for col in &self.nominal {
            let value = row[resolve(&col.field)?].unwrap_or(col.most_frequent);
            let hot = col.code_of(value);
            out.extend((0..col.categories.len()).map(|i| if hot == Some(i) { 1.0 } else { 0.0 }));
        }

        Ok(out)
    }

    pub fn transform_record(&self, record: &ApplicantRecord) -> RiskResult<Vec<f64>> {
        self.transform(&record.to_row())
    }

    pub fn transform_batch(&self, rows: &[RawRow]) -> RiskResult<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
