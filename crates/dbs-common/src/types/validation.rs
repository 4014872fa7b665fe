//! Structural validation of bulk block submissions

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::bulkblock::{AcquisitionEra, Block, BulkBlock, Dataset, PrimaryDataset, ProcessingEra};
use crate::error::ValidationError;

static DATASET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^/([^/\s]+)/([^/\s]+)/([^/\s]+)$").expect("dataset path pattern is valid")
});

/// Borrowed view of the records every submission must carry.
#[derive(Debug, Clone, Copy)]
pub struct BulkBlockParts<'a> {
    pub primds: &'a PrimaryDataset,
    pub processing_era: &'a ProcessingEra,
    pub acquisition_era: &'a AcquisitionEra,
    pub dataset: &'a Dataset,
    pub block: &'a Block,
}

impl BulkBlock {
    /// Required sub-records, or the name of the first one missing.
    pub fn parts(&self) -> Result<BulkBlockParts<'_>, ValidationError> {
        Ok(BulkBlockParts {
            primds: self
                .primds
                .as_ref()
                .ok_or(ValidationError::MissingField("primds"))?,
            processing_era: self
                .processing_era
                .as_ref()
                .ok_or(ValidationError::MissingField("processing_era"))?,
            acquisition_era: self
                .acquisition_era
                .as_ref()
                .ok_or(ValidationError::MissingField("acquisition_era"))?,
            dataset: self
                .dataset
                .as_ref()
                .ok_or(ValidationError::MissingField("dataset"))?,
            block: self
                .block
                .as_ref()
                .ok_or(ValidationError::MissingField("block"))?,
        })
    }

    /// Check the submission before anything is written.
    ///
    /// Empty logical file names are left to the store's own constraint so the
    /// failure surfaces from the insert path.
    pub fn validate(&self) -> Result<BulkBlockParts<'_>, ValidationError> {
        let parts = self.parts()?;

        require(&parts.primds.primary_ds_name, "primds.primary_ds_name")?;
        require(&parts.primds.primary_ds_type, "primds.primary_ds_type")?;
        require(
            &parts.acquisition_era.acquisition_era_name,
            "acquisition_era.acquisition_era_name",
        )?;
        require(&parts.dataset.processed_ds_name, "dataset.processed_ds_name")?;
        require(&parts.dataset.data_tier_name, "dataset.data_tier_name")?;
        require(&parts.dataset.dataset_access_type, "dataset.dataset_access_type")?;
        require(&parts.block.block_name, "block.block_name")?;

        validate_dataset_path(parts.dataset, parts.primds)?;

        let expected_prefix = format!("{}#", parts.dataset.dataset);
        if !parts.block.block_name.starts_with(&expected_prefix)
            || parts.block.block_name.len() == expected_prefix.len()
        {
            return Err(ValidationError::InvalidBlockName {
                block: parts.block.block_name.clone(),
                dataset: parts.dataset.dataset.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.files.len());
        for file in &self.files {
            if !seen.insert(file.logical_file_name.as_str()) {
                return Err(ValidationError::DuplicateFile(file.logical_file_name.clone()));
            }
            require(&file.file_type, "files.file_type")?;
            if file.file_size < 0 {
                return Err(ValidationError::NegativeValue {
                    field: "file_size",
                    lfn: file.logical_file_name.clone(),
                });
            }
            if file.event_count < 0 {
                return Err(ValidationError::NegativeValue {
                    field: "event_count",
                    lfn: file.logical_file_name.clone(),
                });
            }
            if let Some(lumi) = file
                .file_lumi_list
                .iter()
                .find(|l| l.run_num < 0 || l.lumi_section_num < 0)
            {
                return Err(ValidationError::InvalidLumi {
                    lfn: file.logical_file_name.clone(),
                    run_num: lumi.run_num,
                    lumi_section_num: lumi.lumi_section_num,
                });
            }
        }

        for parent in &self.dataset_parent_list {
            if !DATASET_PATH.is_match(parent) {
                return Err(ValidationError::InvalidDatasetPath(parent.clone()));
            }
        }

        Ok(parts)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn validate_dataset_path(dataset: &Dataset, primds: &PrimaryDataset) -> Result<(), ValidationError> {
    let captures = DATASET_PATH
        .captures(&dataset.dataset)
        .ok_or_else(|| ValidationError::InvalidDatasetPath(dataset.dataset.clone()))?;

    let checks = [
        (1, "primds.primary_ds_name", primds.primary_ds_name.as_str()),
        (2, "dataset.processed_ds_name", dataset.processed_ds_name.as_str()),
        (3, "dataset.data_tier_name", dataset.data_tier_name.as_str()),
    ];
    for (group, field, value) in checks {
        if captures.get(group).map(|m| m.as_str()) != Some(value) {
            return Err(ValidationError::DatasetMismatch {
                dataset: dataset.dataset.clone(),
                field,
                value: value.to_string(),
            });
        }
    }

    Ok(())
}
