//! Admission control: checks untyped payloads against the field contract.
//!
//! This is the only gate in front of the preprocessing pipeline. All
//! violations of a payload are reported together, in field order.

use serde_json::{Map, Value};

use crate::common::error::{RiskError, RiskResult};

use super::domain::{
    ApplicantRecord, FieldSpec, FieldViolation, ValidationErrors, FIELDS, FIELD_COUNT,
};

/// Validate a JSON payload into an [`ApplicantRecord`].
pub fn validate_applicant(payload: &Value) -> Result<ApplicantRecord, ValidationErrors> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationErrors {
            violations: vec![FieldViolation::wrong_type("body", payload.clone())],
        });
    };

    let mut values = [0i64; FIELD_COUNT];
    let mut errors = ValidationErrors::default();
    for (idx, spec) in FIELDS.iter().enumerate() {
        match check_field(object, spec) {
            Ok(value) => values[idx] = value,
            Err(violation) => errors.violations.push(violation),
        }
    }

    if errors.is_empty() {
        Ok(ApplicantRecord::from_validated(values))
    } else {
        Err(errors)
    }
}

/// Validate already-typed values given in [`FIELDS`] order.
pub fn applicant_from_values(values: [i64; FIELD_COUNT]) -> Result<ApplicantRecord, ValidationErrors> {
    let violations: Vec<FieldViolation> = FIELDS
        .iter()
        .zip(values.iter())
        .filter(|(spec, value)| !spec.contains(**value))
        .map(|(spec, value)| FieldViolation::out_of_range(spec, *value))
        .collect();

    if violations.is_empty() {
        Ok(ApplicantRecord::from_validated(values))
    } else {
        Err(ValidationErrors { violations })
    }
}

/// [`validate_applicant`] lifted into the crate error type.
pub fn admit(payload: &Value) -> RiskResult<ApplicantRecord> {
    validate_applicant(payload).map_err(RiskError::Validation)
}

fn check_field(object: &Map<String, Value>, spec: &FieldSpec) -> Result<i64, FieldViolation> {
    let raw = object
        .get(spec.code)
        .or_else(|| object.get(spec.alias))
        .ok_or_else(|| FieldViolation::missing(spec.code))?;

    let value = as_integer(raw).ok_or_else(|| FieldViolation::wrong_type(spec.code, raw.clone()))?;
    if spec.contains(value) {
        Ok(value)
    } else {
        // Report the value as sent, not its clamped integer form.
        Err(FieldViolation {
            input: raw.clone(),
            ..FieldViolation::out_of_range(spec, value)
        })
    }
}

/// Integers, and floats without a fractional part. Everything else is a type error.
fn as_integer(raw: &Value) -> Option<i64> {
    let Value::Number(number) = raw else {
        return None;
    };
    if let Some(v) = number.as_i64() {
        return Some(v);
    }
    if number.as_u64().is_some() {
        // Above i64::MAX: still an integer, so report it as out of range.
        return Some(i64::MAX);
    }
    let f = number.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
