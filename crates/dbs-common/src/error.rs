//! Error types for DBS

use thiserror::Error;

/// Structural problems found in a bulk block submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("dataset '{0}' must have the form /primary/processed/tier")]
    InvalidDatasetPath(String),

    #[error("dataset '{dataset}' does not match {field} '{value}'")]
    DatasetMismatch {
        dataset: String,
        field: &'static str,
        value: String,
    },

    #[error("block '{block}' must be named '{dataset}#<suffix>'")]
    InvalidBlockName { block: String, dataset: String },

    #[error("file '{0}' appears more than once in the submission")]
    DuplicateFile(String),

    #[error("{field} must not be negative (file '{lfn}')")]
    NegativeValue { field: &'static str, lfn: String },

    #[error("file '{lfn}' lists run {run_num} lumi {lumi_section_num}, which is out of range")]
    InvalidLumi {
        lfn: String,
        run_num: i64,
        lumi_section_num: i64,
    },
}
