//! Bulk block submission model
//!
//! A bulk block carries one dataset's metadata together with every file of one
//! block, each file with its lumi sections and parentage. Field names follow the
//! JSON documents producers already send.

use serde::{Deserialize, Serialize};

/// One bulk block submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkBlock {
    #[serde(default)]
    pub dataset_conf_list: Vec<DatasetConfig>,
    #[serde(default)]
    pub file_conf_list: Vec<FileConfig>,
    #[serde(default)]
    pub files: Vec<File>,
    pub processing_era: Option<ProcessingEra>,
    pub primds: Option<PrimaryDataset>,
    pub dataset: Option<Dataset>,
    pub acquisition_era: Option<AcquisitionEra>,
    pub block: Option<Block>,
    /// Parentage for files of this block, listed at submission level.
    #[serde(default)]
    pub file_parent_list: Vec<FileParentLink>,
    /// Parent dataset paths.
    #[serde(default)]
    pub dataset_parent_list: Vec<String>,
}

impl BulkBlock {
    /// Total bytes of all submitted files.
    pub fn total_file_size(&self) -> i64 {
        self.files.iter().map(|f| f.file_size).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryDataset {
    pub primary_ds_name: String,
    pub primary_ds_type: String,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEra {
    pub processing_version: i64,
    pub description: Option<String>,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionEra {
    pub acquisition_era_name: String,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub description: Option<String>,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Full path: `/primary/processed/tier`.
    pub dataset: String,
    pub processed_ds_name: String,
    pub data_tier_name: String,
    pub dataset_access_type: String,
    pub physics_group_name: Option<String>,
    pub is_dataset_valid: Option<i64>,
    pub xtcrosssection: Option<f64>,
    pub prep_id: Option<String>,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
    pub last_modified_by: Option<String>,
    pub last_modification_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_name: String,
    #[serde(default)]
    pub origin_site_name: String,
    pub open_for_writing: Option<i64>,
    /// Informational; the stored value is recomputed from the files.
    pub block_size: Option<i64>,
    /// Informational; the stored value is recomputed from the files.
    pub file_count: Option<i64>,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub logical_file_name: String,
    pub file_type: String,
    pub check_sum: Option<String>,
    pub adler32: Option<String>,
    pub md5: Option<String>,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub event_count: i64,
    pub auto_cross_section: Option<f64>,
    /// Missing means valid (1).
    pub is_file_valid: Option<i64>,
    pub create_by: Option<String>,
    pub creation_date: Option<i64>,
    pub last_modified_by: Option<String>,
    pub last_modification_date: Option<i64>,
    #[serde(default)]
    pub file_lumi_list: Vec<FileLumi>,
    #[serde(default)]
    pub file_parent_list: Vec<FileParent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLumi {
    pub run_num: i64,
    pub lumi_section_num: i64,
    pub event_count: Option<i64>,
}

/// Parent reference nested inside a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParent {
    pub parent_logical_file_name: String,
}

/// Parent reference listed at submission level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParentLink {
    pub logical_file_name: String,
    pub parent_logical_file_name: String,
}

/// Output module configuration attached to the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub app_name: String,
    pub release_version: String,
    pub pset_hash: String,
    pub pset_name: Option<String>,
    pub output_module_label: String,
    #[serde(default)]
    pub global_tag: String,
    pub scenario: Option<String>,
}

/// Output module configuration attached to one file of the block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(alias = "lfn")]
    pub logical_file_name: String,
    pub app_name: String,
    pub release_version: String,
    pub pset_hash: String,
    pub pset_name: Option<String>,
    pub output_module_label: String,
    #[serde(default)]
    pub global_tag: String,
    pub scenario: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_submission() {
        let json = r#"{
            "primds": {"primary_ds_name": "Cosmics", "primary_ds_type": "data"},
            "processing_era": {"processing_version": 1},
            "acquisition_era": {"acquisition_era_name": "Run2024A"},
            "dataset": {
                "dataset": "/Cosmics/Run2024A-v1/RAW",
                "processed_ds_name": "Run2024A-v1",
                "data_tier_name": "RAW",
                "dataset_access_type": "VALID"
            },
            "block": {"block_name": "/Cosmics/Run2024A-v1/RAW#0001", "origin_site_name": "T1_US_FNAL"},
            "files": [{
                "logical_file_name": "/store/data/a.root",
                "file_type": "EDM",
                "file_size": 1024,
                "file_lumi_list": [{"run_num": 1, "lumi_section_num": 7}]
            }]
        }"#;

        let block: BulkBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.files.len(), 1);
        assert_eq!(block.files[0].is_file_valid, None);
        assert_eq!(block.files[0].file_lumi_list[0].event_count, None);
        assert!(block.dataset_parent_list.is_empty());
        assert_eq!(block.total_file_size(), 1024);
    }

    #[test]
    fn test_file_config_accepts_lfn_alias() {
        let json = r#"{"lfn": "/store/x.root", "app_name": "cmsRun", "release_version": "CMSSW_14_0_0",
                       "pset_hash": "abc", "output_module_label": "out"}"#;
        let conf: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(conf.logical_file_name, "/store/x.root");
        assert_eq!(conf.global_tag, "");
    }
}
