//! Applicant field contract, validated records and training datasets.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::common::error::RiskResult;

/// Number of applicant attributes in the contract.
pub const FIELD_COUNT: usize = 20;

/// One attribute of the contract: wire code, descriptive alias and
/// inclusive range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    /// Dataset column name, also the primary JSON key.
    pub code: &'static str,
    /// Descriptive kebab-case key accepted as an alternative.
    pub alias: &'static str,
    pub min: i64,
    pub max: i64,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

const fn field(
    code: &'static str,
    alias: &'static str,
    min: i64,
    max: i64,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        code,
        alias,
        min,
        max,
        description,
    }
}

/// The contract, in dataset column order.
pub const FIELDS: [FieldSpec; FIELD_COUNT] = [
    field("laufkont", "checking-account-status", 1, 4, "Status of existing checking account (1=very good, 4=critical)"),
    field("laufzeit", "loan-duration-months", 4, 72, "Duration of the loan in months"),
    field("moral", "credit-history", 0, 4, "Credit history (0=excellent, 4=critical)"),
    field("verw", "loan-purpose", 0, 10, "Purpose of the credit (0=car, 1=furniture, 2=radio/TV, ...)"),
    field("hoehe", "loan-amount", 250, 18424, "Loan amount in DM"),
    field("sparkont", "savings-status", 1, 5, "Savings account/bonds (1=very good, 5=unknown/none)"),
    field("beszeit", "employment-duration", 1, 5, "Length of current employment (1=<1yr, 5=unemployed)"),
    field("rate", "installment-rate", 1, 4, "Installment rate as a share of disposable income"),
    field("famges", "personal-status", 1, 4, "Personal status and sex"),
    field("buerge", "other-debtors", 1, 3, "Other debtors/guarantors (1=none, 2=co-applicant, 3=guarantor)"),
    field("wohnzeit", "residence-duration", 1, 4, "Present residence since (1=<1yr, 4=>=7yrs)"),
    field("verm", "property", 1, 4, "Property (1=real estate, 4=unknown/none)"),
    field("alter", "age", 19, 75, "Age in years"),
    field("weitkred", "other-installment-plans", 1, 3, "Other installment plans (1=bank, 2=store, 3=none)"),
    field("wohn", "housing", 1, 3, "Housing (1=rent, 2=own, 3=for free)"),
    field("bishkred", "existing-credits-count", 1, 4, "Number of existing credits at this bank"),
    field("beruf", "job-category", 1, 4, "Job category (1=unemployed/unskilled, 4=highly skilled)"),
    field("pers", "dependents-count", 1, 2, "People liable for maintenance (1=none, 2=one or more)"),
    field("telef", "telephone", 1, 2, "Telephone (1=yes, 2=no)"),
    field("gastarb", "foreign-worker", 1, 2, "Foreign worker (1=yes, 2=no)"),
];

/// Position of a field code in [`FIELDS`].
pub fn field_index(code: &str) -> Option<usize> {
    FIELDS.iter().position(|spec| spec.code == code)
}

/// A raw dataset row aligned with [`FIELDS`]; `None` marks a missing cell.
pub type RawRow = [Option<i64>; FIELD_COUNT];

/// An applicant that passed the contract. Immutable once built.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ApplicantRecord {
    values: [i64; FIELD_COUNT],
}

impl ApplicantRecord {
    /// Only the validator constructs records, so every value is in range.
    pub(crate) fn from_validated(values: [i64; FIELD_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, code: &str) -> Option<i64> {
        field_index(code).map(|idx| self.values[idx])
    }

    pub fn values(&self) -> &[i64; FIELD_COUNT] {
        &self.values
    }

    /// Row form consumed by the preprocessing pipeline.
    pub fn to_row(&self) -> RawRow {
        self.values.map(Some)
    }
}

/// Labelled rows used for offline fitting and training.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub rows: Vec<RawRow>,
    /// Binary target per row; 1 is the positive (default) class.
    pub targets: Vec<u8>,
}

impl Dataset {
    pub fn new(rows: Vec<RawRow>, targets: Vec<u8>) -> Self {
        Self { rows, targets }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Repository contract for labelled datasets.
pub trait DataRepo {
    fn load_dataset(&self) -> RiskResult<Dataset>;
}

/// Coarse violation classes of the contract.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    OutOfRange,
    WrongType,
}

/// A single contract violation.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldViolation {
    /// Field code, or `"body"` when the payload is not an object.
    pub field: &'static str,
    pub kind: ViolationKind,
    /// The offending value (`Null` when missing).
    pub input: Value,
    /// Violated bound for range failures.
    pub limit: Option<i64>,
    pub below_min: bool,
}

impl FieldViolation {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: ViolationKind::Missing,
            input: Value::Null,
            limit: None,
            below_min: false,
        }
    }

    pub fn wrong_type(field: &'static str, input: Value) -> Self {
        Self {
            field,
            kind: ViolationKind::WrongType,
            input,
            limit: None,
            below_min: false,
        }
    }

    pub fn out_of_range(spec: &FieldSpec, value: i64) -> Self {
        let below_min = value < spec.min;
        Self {
            field: spec.code,
            kind: ViolationKind::OutOfRange,
            input: Value::from(value),
            limit: Some(if below_min { spec.min } else { spec.max }),
            below_min,
        }
    }

    /// Fine-grained type name used on the wire.
    pub fn detail_type(&self) -> &'static str {
        match self.kind {
            ViolationKind::Missing => "missing",
            ViolationKind::WrongType if self.field == "body" => "model_attributes_type",
            ViolationKind::WrongType => "int_type",
            ViolationKind::OutOfRange if self.below_min => "greater_than_equal",
            ViolationKind::OutOfRange => "less_than_equal",
        }
    }

    pub fn message(&self) -> String {
        match (self.kind, self.limit) {
            (ViolationKind::Missing, _) => "Field required".to_string(),
            (ViolationKind::WrongType, _) if self.field == "body" => {
                "Input should be a valid object".to_string()
            }
            (ViolationKind::WrongType, _) => "Input should be a valid integer".to_string(),
            (ViolationKind::OutOfRange, Some(limit)) if self.below_min => {
                format!("Input should be greater than or equal to {limit}")
            }
            (ViolationKind::OutOfRange, Some(limit)) => {
                format!("Input should be less than or equal to {limit}")
            }
            (ViolationKind::OutOfRange, None) => "Input out of range".to_string(),
        }
    }
}

/// Every violation found in one record, in field order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field violation(s)", self.violations.len())?;
        for (idx, v) in self.violations.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { ", " };
            write!(f, "{sep}{} ({})", v.field, v.detail_type())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_codes_and_aliases_are_unique() {
        for (i, a) in FIELDS.iter().enumerate() {
            assert!(a.min <= a.max, "{} has an empty range", a.code);
            for b in FIELDS.iter().skip(i + 1) {
                assert_ne!(a.code, b.code);
                assert_ne!(a.alias, b.alias);
            }
        }
    }

    #[test]
    fn record_row_round_trip() {
        let values: [i64; FIELD_COUNT] = std::array::from_fn(|i| FIELDS[i].min);
        let record = ApplicantRecord::from_validated(values);
        assert_eq!(record.get("hoehe"), Some(250));
        assert_eq!(record.get("nope"), None);
        assert!(record.to_row().iter().all(Option::is_some));
    }

    #[test]
    fn violation_detail_types() {
        let spec = FIELDS[0];
        assert_eq!(FieldViolation::out_of_range(&spec, 5).detail_type(), "less_than_equal");
        assert_eq!(FieldViolation::out_of_range(&spec, 0).detail_type(), "greater_than_equal");
        assert_eq!(FieldViolation::missing("laufkont").detail_type(), "missing");
        let errors = ValidationErrors {
            violations: vec![FieldViolation::out_of_range(&spec, 5)],
        };
        assert_eq!(errors.to_string(), "1 field violation(s): laufkont (less_than_equal)");
    }
}
