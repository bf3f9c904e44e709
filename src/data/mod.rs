//! Data domain: the applicant field contract, admission validation and
//! historical dataset loading.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{ApplicantRecord, Dataset, FieldSpec, RawRow, ValidationErrors, FIELDS, FIELD_COUNT};
