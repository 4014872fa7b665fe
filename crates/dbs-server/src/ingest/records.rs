//! Rows for natural-key entities, ready for the resolver
//!
//! A [`ReferenceRecord`] carries the table, the natural-key values bound to
//! its `get_id` statement, and the column values bound after the surrogate id
//! in its `insert` statement.

use dbs_common::types::{AcquisitionEra, Dataset, PrimaryDataset, ProcessingEra};

use super::tables::Table;
use crate::db::executor::{display_key, SqlValue};

/// Creator and timestamp applied where a submission leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDefaults {
    pub create_by: String,
    pub creation_date: i64,
}

impl SubmissionDefaults {
    pub fn new(create_by: impl Into<String>) -> Self {
        Self {
            create_by: create_by.into(),
            creation_date: chrono::Utc::now().timestamp(),
        }
    }

    pub fn creator(&self, given: Option<&String>) -> String {
        given
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| self.create_by.clone())
    }

    pub fn date(&self, given: Option<i64>) -> i64 {
        given.unwrap_or(self.creation_date)
    }
}

/// Foreign keys a dataset row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetRefs {
    pub primary_ds_id: i64,
    pub processed_ds_id: i64,
    pub data_tier_id: i64,
    pub dataset_access_type_id: i64,
    pub acquisition_era_id: i64,
    pub processing_era_id: i64,
    pub physics_group_id: Option<i64>,
}

/// Foreign keys an output module config row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfigRefs {
    pub app_exec_id: i64,
    pub release_version_id: i64,
    pub parameter_set_hash_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub table: Table,
    pub key: Vec<SqlValue>,
    pub values: Vec<SqlValue>,
}

impl ReferenceRecord {
    fn single(table: Table, name: &str) -> Self {
        Self {
            table,
            key: vec![name.into()],
            values: vec![name.into()],
        }
    }

    pub fn display_key(&self) -> String {
        display_key(&self.key)
    }

    pub fn primary_ds_type(name: &str) -> Self {
        Self::single(Table::PrimaryDsTypes, name)
    }

    pub fn primary_dataset(primds: &PrimaryDataset, type_id: i64, d: &SubmissionDefaults) -> Self {
        Self {
            table: Table::PrimaryDatasets,
            key: vec![primds.primary_ds_name.as_str().into()],
            values: vec![
                primds.primary_ds_name.as_str().into(),
                type_id.into(),
                d.date(primds.creation_date).into(),
                d.creator(primds.create_by.as_ref()).into(),
            ],
        }
    }

    pub fn processing_era(era: &ProcessingEra, d: &SubmissionDefaults) -> Self {
        Self {
            table: Table::ProcessingEras,
            key: vec![era.processing_version.into()],
            values: vec![
                era.processing_version.into(),
                era.description.clone().into(),
                d.date(era.creation_date).into(),
                d.creator(era.create_by.as_ref()).into(),
            ],
        }
    }

    pub fn acquisition_era(era: &AcquisitionEra, d: &SubmissionDefaults) -> Self {
        Self {
            table: Table::AcquisitionEras,
            key: vec![era.acquisition_era_name.as_str().into()],
            values: vec![
                era.acquisition_era_name.as_str().into(),
                era.start_date.into(),
                era.end_date.into(),
                era.description.clone().into(),
                d.date(era.creation_date).into(),
                d.creator(era.create_by.as_ref()).into(),
            ],
        }
    }

    pub fn data_tier(name: &str, d: &SubmissionDefaults) -> Self {
        Self {
            table: Table::DataTiers,
            key: vec![name.into()],
            values: vec![
                name.into(),
                d.creation_date.into(),
                d.create_by.as_str().into(),
            ],
        }
    }

    pub fn physics_group(name: &str) -> Self {
        Self::single(Table::PhysicsGroups, name)
    }

    pub fn dataset_access_type(name: &str) -> Self {
        Self::single(Table::DatasetAccessTypes, name)
    }

    pub fn processed_dataset(name: &str) -> Self {
        Self::single(Table::ProcessedDatasets, name)
    }

    pub fn dataset(dataset: &Dataset, refs: DatasetRefs, d: &SubmissionDefaults) -> Self {
        let created = d.date(dataset.creation_date);
        let creator = d.creator(dataset.create_by.as_ref());
        Self {
            table: Table::Datasets,
            key: vec![dataset.dataset.as_str().into()],
            values: vec![
                dataset.dataset.as_str().into(),
                dataset.is_dataset_valid.unwrap_or(1).into(),
                refs.primary_ds_id.into(),
                refs.processed_ds_id.into(),
                refs.data_tier_id.into(),
                refs.dataset_access_type_id.into(),
                refs.acquisition_era_id.into(),
                refs.processing_era_id.into(),
                refs.physics_group_id.into(),
                dataset.xtcrosssection.into(),
                dataset.prep_id.clone().into(),
                created.into(),
                creator.clone().into(),
                dataset.last_modification_date.unwrap_or(created).into(),
                dataset
                    .last_modified_by
                    .clone()
                    .unwrap_or(creator)
                    .into(),
            ],
        }
    }

    pub fn file_data_type(name: &str) -> Self {
        Self::single(Table::FileDataTypes, name)
    }

    pub fn app_executable(name: &str) -> Self {
        Self::single(Table::AppExecutables, name)
    }

    pub fn release_version(version: &str) -> Self {
        Self::single(Table::ReleaseVersions, version)
    }

    pub fn parameter_set_hash(hash: &str, pset_name: Option<&String>) -> Self {
        Self {
            table: Table::ParameterSetHashes,
            key: vec![hash.into()],
            values: vec![hash.into(), pset_name.into()],
        }
    }

    pub fn output_module_config(
        refs: OutputConfigRefs,
        label: &str,
        global_tag: &str,
        scenario: Option<&String>,
        d: &SubmissionDefaults,
    ) -> Self {
        Self {
            table: Table::OutputModuleConfigs,
            key: vec![
                refs.app_exec_id.into(),
                refs.release_version_id.into(),
                refs.parameter_set_hash_id.into(),
                label.into(),
                global_tag.into(),
            ],
            values: vec![
                refs.app_exec_id.into(),
                refs.release_version_id.into(),
                refs.parameter_set_hash_id.into(),
                label.into(),
                global_tag.into(),
                scenario.into(),
                d.creation_date.into(),
                d.create_by.as_str().into(),
            ],
        }
    }
}
