//! Catalog tables that carry a surrogate id.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    PrimaryDsTypes,
    PrimaryDatasets,
    ProcessingEras,
    AcquisitionEras,
    DataTiers,
    PhysicsGroups,
    DatasetAccessTypes,
    ProcessedDatasets,
    Datasets,
    Blocks,
    FileDataTypes,
    Files,
    AppExecutables,
    ReleaseVersions,
    ParameterSetHashes,
    OutputModuleConfigs,
}

impl Table {
    pub const ALL: [Table; 16] = [
        Table::PrimaryDsTypes,
        Table::PrimaryDatasets,
        Table::ProcessingEras,
        Table::AcquisitionEras,
        Table::DataTiers,
        Table::PhysicsGroups,
        Table::DatasetAccessTypes,
        Table::ProcessedDatasets,
        Table::Datasets,
        Table::Blocks,
        Table::FileDataTypes,
        Table::Files,
        Table::AppExecutables,
        Table::ReleaseVersions,
        Table::ParameterSetHashes,
        Table::OutputModuleConfigs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::PrimaryDsTypes => "primary_ds_types",
            Table::PrimaryDatasets => "primary_datasets",
            Table::ProcessingEras => "processing_eras",
            Table::AcquisitionEras => "acquisition_eras",
            Table::DataTiers => "data_tiers",
            Table::PhysicsGroups => "physics_groups",
            Table::DatasetAccessTypes => "dataset_access_types",
            Table::ProcessedDatasets => "processed_datasets",
            Table::Datasets => "datasets",
            Table::Blocks => "blocks",
            Table::FileDataTypes => "file_data_types",
            Table::Files => "files",
            Table::AppExecutables => "app_executables",
            Table::ReleaseVersions => "release_versions",
            Table::ParameterSetHashes => "parameter_set_hashes",
            Table::OutputModuleConfigs => "output_module_configs",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            Table::PrimaryDsTypes => "primary_ds_type_id",
            Table::PrimaryDatasets => "primary_ds_id",
            Table::ProcessingEras => "processing_era_id",
            Table::AcquisitionEras => "acquisition_era_id",
            Table::DataTiers => "data_tier_id",
            Table::PhysicsGroups => "physics_group_id",
            Table::DatasetAccessTypes => "dataset_access_type_id",
            Table::ProcessedDatasets => "processed_ds_id",
            Table::Datasets => "dataset_id",
            Table::Blocks => "block_id",
            Table::FileDataTypes => "file_type_id",
            Table::Files => "file_id",
            Table::AppExecutables => "app_exec_id",
            Table::ReleaseVersions => "release_version_id",
            Table::ParameterSetHashes => "parameter_set_hash_id",
            Table::OutputModuleConfigs => "output_mod_config_id",
        }
    }

    /// Entity label used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            Table::PrimaryDsTypes => "primary dataset type",
            Table::PrimaryDatasets => "primary dataset",
            Table::ProcessingEras => "processing era",
            Table::AcquisitionEras => "acquisition era",
            Table::DataTiers => "data tier",
            Table::PhysicsGroups => "physics group",
            Table::DatasetAccessTypes => "dataset access type",
            Table::ProcessedDatasets => "processed dataset",
            Table::Datasets => "dataset",
            Table::Blocks => "block",
            Table::FileDataTypes => "file data type",
            Table::Files => "file",
            Table::AppExecutables => "application executable",
            Table::ReleaseVersions => "release version",
            Table::ParameterSetHashes => "parameter set hash",
            Table::OutputModuleConfigs => "output module config",
        }
    }

    pub fn sequence(self) -> String {
        format!("seq_{}", self.name())
    }

    pub fn get_id_statement(self) -> String {
        format!("{}.get_id", self.name())
    }

    pub fn insert_statement(self) -> String {
        format!("{}.insert", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::{StatementProvider, TemplateStatements};

    #[test]
    fn test_every_table_has_lookup_and_insert_statements() {
        let statements = TemplateStatements::builtin("");
        for table in Table::ALL {
            let lookup = statements.statement(&table.get_id_statement()).unwrap();
            assert!(lookup.contains(table.id_column()), "{table}");
            let insert = statements.statement(&table.insert_statement()).unwrap();
            assert!(insert.starts_with("INSERT INTO"), "{table}");
        }
    }
}
