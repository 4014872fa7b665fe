//! Bulk block fixtures
//!
//! ```rust,ignore
//! let submission = TestBulkBlock::new("alpha").with_files(3).with_lumis(2).build();
//! ```

use dbs_common::types::{
    AcquisitionEra, Block, BulkBlock, Dataset, DatasetConfig, File, FileConfig, FileLumi,
    PrimaryDataset, ProcessingEra,
};

/// Builder for bulk block submissions
#[derive(Debug, Clone)]
pub struct TestBulkBlock {
    pub tag: String,
    pub files: usize,
    pub lumis: usize,
    pub file_type: String,
}

impl TestBulkBlock {
    /// Create a builder whose names are all derived from `tag`
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            files: 1,
            lumis: 1,
            file_type: "EDM".to_string(),
        }
    }

    /// Number of files in the block
    pub fn with_files(mut self, files: usize) -> Self {
        self.files = files;
        self
    }

    /// Number of lumi sections per file
    pub fn with_lumis(mut self, lumis: usize) -> Self {
        self.lumis = lumis;
        self
    }

    pub fn dataset_path(&self) -> String {
        format!("/Prim{0}/Proc{0}-v1/RAW", self.tag)
    }

    pub fn block_name(&self) -> String {
        format!("{}#block-{}", self.dataset_path(), self.tag)
    }

    pub fn lfn(&self, index: usize) -> String {
        format!("/store/data/{}/file_{index:05}.root", self.tag)
    }

    pub fn build(&self) -> BulkBlock {
        let conf = DatasetConfig {
            app_name: "cmsRun".to_string(),
            release_version: "CMSSW_14_0_7".to_string(),
            pset_hash: format!("hash-{}", self.tag),
            pset_name: None,
            output_module_label: "RAWoutput".to_string(),
            global_tag: "140X_dataRun3_v4".to_string(),
            scenario: Some("pp".to_string()),
        };

        let files: Vec<File> = (0..self.files)
            .map(|i| File {
                logical_file_name: self.lfn(i),
                file_type: self.file_type.clone(),
                check_sum: Some(format!("{}", 1000 + i)),
                adler32: Some("deadbeef".to_string()),
                file_size: 2_000_000 + i as i64,
                event_count: 100,
                file_lumi_list: (0..self.lumis)
                    .map(|l| FileLumi {
                        run_num: 380_000,
                        lumi_section_num: (i * self.lumis + l) as i64 + 1,
                        event_count: Some(10),
                    })
                    .collect(),
                ..Default::default()
            })
            .collect();

        let file_conf_list = files
            .iter()
            .map(|f| FileConfig {
                logical_file_name: f.logical_file_name.clone(),
                app_name: conf.app_name.clone(),
                release_version: conf.release_version.clone(),
                pset_hash: conf.pset_hash.clone(),
                pset_name: None,
                output_module_label: conf.output_module_label.clone(),
                global_tag: conf.global_tag.clone(),
                scenario: conf.scenario.clone(),
            })
            .collect();

        BulkBlock {
            dataset_conf_list: vec![conf],
            file_conf_list,
            files,
            processing_era: Some(ProcessingEra {
                processing_version: 1,
                description: Some("test".to_string()),
                ..Default::default()
            }),
            primds: Some(PrimaryDataset {
                primary_ds_name: format!("Prim{}", self.tag),
                primary_ds_type: "data".to_string(),
                ..Default::default()
            }),
            dataset: Some(Dataset {
                dataset: self.dataset_path(),
                processed_ds_name: format!("Proc{}-v1", self.tag),
                data_tier_name: "RAW".to_string(),
                dataset_access_type: "VALID".to_string(),
                physics_group_name: Some("Tracker".to_string()),
                ..Default::default()
            }),
            acquisition_era: Some(AcquisitionEra {
                acquisition_era_name: format!("Run{}", self.tag),
                ..Default::default()
            }),
            block: Some(Block {
                block_name: self.block_name(),
                origin_site_name: "T0_CH_CERN".to_string(),
                ..Default::default()
            }),
            file_parent_list: Vec::new(),
            dataset_parent_list: Vec::new(),
        }
    }
}
