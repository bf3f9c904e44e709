//! Feature group partition and the fitted preprocessor artifact.

use serde::{Deserialize, Serialize};

use crate::common::error::{RiskError, RiskResult};

/// Artifact format understood by this build.
pub const PREPROCESSOR_FORMAT_VERSION: u32 = 1;

/// Continuous fields: median imputation, then standardisation.
pub const NUMERIC_FIELDS: [&str; 3] = ["laufzeit", "hoehe", "alter"];

/// Ordered categorical fields: most-frequent imputation, then integer codes.
pub const ORDINAL_FIELDS: [&str; 7] = [
    "laufkont", "sparkont", "beszeit", "rate", "wohnzeit", "bishkred", "pers",
];

/// Unordered categorical fields: most-frequent imputation, then one-hot.
pub const NOMINAL_FIELDS: [&str; 10] = [
    "moral", "verw", "famges", "buerge", "verm", "weitkred", "wohn", "beruf", "telef", "gastarb",
];

/// Group a field belongs to; also the prefix of its output columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    Numeric,
    Ordinal,
    Nominal,
}

impl FeatureGroup {
    pub fn prefix(&self) -> &'static str {
        match self {
            FeatureGroup::Numeric => "num",
            FeatureGroup::Ordinal => "ord",
            FeatureGroup::Nominal => "nom",
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            FeatureGroup::Numeric => &NUMERIC_FIELDS,
            FeatureGroup::Ordinal => &ORDINAL_FIELDS,
            FeatureGroup::Nominal => &NOMINAL_FIELDS,
        }
    }
}

/// Fit-time statistics for one numeric field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub field: String,
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation, or 1.0 when it is zero.
    pub scale: f64,
}

/// Fit-time statistics for one categorical field. Used by both the ordinal
/// and nominal groups; only the encoding differs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub field: String,
    pub most_frequent: i64,
    /// Sorted, distinct values observed after imputation.
    pub categories: Vec<i64>,
}

impl CategoricalColumn {
    pub fn code_of(&self, value: i64) -> Option<usize> {
        self.categories.binary_search(&value).ok()
    }
}

/// The fitted preprocessing pipeline. Immutable after fitting; shared
/// read-only by every serving-time transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub format_version: u32,
    /// Rows seen during fitting.
    pub n_samples: usize,
    pub numeric: Vec<NumericColumn>,
    pub ordinal: Vec<CategoricalColumn>,
    pub nominal: Vec<CategoricalColumn>,
}

impl FittedPreprocessor {
    /// Width of the transformed vector: numeric, then ordinal, then one
    /// column per nominal category.
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self.ordinal.len()
            + self.nominal.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Post-encoding column names, aligned with the transformed vector.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.output_width());
        for col in &self.numeric {
            names.push(format!("{}__{}", FeatureGroup::Numeric.prefix(), col.field));
        }
        for col in &self.ordinal {
            names.push(format!("{}__{}", FeatureGroup::Ordinal.prefix(), col.field));
        }
        for col in &self.nominal {
            for category in &col.categories {
                names.push(format!(
                    "{}__{}_{}",
                    FeatureGroup::Nominal.prefix(),
                    col.field,
                    category
                ));
            }
        }
        names
    }

    /// Reject artifacts whose format or group partition differ from this
    /// build. A silent layout change would corrupt every prediction.
    pub fn check_compatible(&self) -> RiskResult<()> {
        if self.format_version != PREPROCESSOR_FORMAT_VERSION {
            return Err(RiskError::artifact_mismatch(format!(
                "preprocessor format {} is not supported (expected {})",
                self.format_version, PREPROCESSOR_FORMAT_VERSION
            )));
        }
        check_group(FeatureGroup::Numeric, self.numeric.iter().map(|c| c.field.as_str()))?;
        check_group(FeatureGroup::Ordinal, self.ordinal.iter().map(|c| c.field.as_str()))?;
        check_group(FeatureGroup::Nominal, self.nominal.iter().map(|c| c.field.as_str()))?;
        for col in self.ordinal.iter().chain(self.nominal.iter()) {
            if col.categories.is_empty() || col.categories.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RiskError::artifact_mismatch(format!(
                    "categories of {} are empty or not strictly sorted",
                    col.field
                )));
            }
        }
        Ok(())
    }
}

fn check_group<'a>(group: FeatureGroup, fitted: impl Iterator<Item = &'a str>) -> RiskResult<()> {
    let fitted: Vec<&str> = fitted.collect();
    if fitted != group.fields() {
        return Err(RiskError::artifact_mismatch(format!(
            "{} group was fit on {:?}, this build expects {:?}",
            group.prefix(),
            fitted,
            group.fields()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::{field_index, FIELD_COUNT};

    #[test]
    fn partition_covers_every_field_once() {
        let mut seen = [0u8; FIELD_COUNT];
        for group in [FeatureGroup::Numeric, FeatureGroup::Ordinal, FeatureGroup::Nominal] {
            for code in group.fields() {
                let idx = field_index(code).expect("partition names a contract field");
                seen[idx] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }
}
