//! Parentage and output-config links written inside the block transaction.
//!
//! Every link insert is `ON CONFLICT DO NOTHING`, so a resubmitted block adds
//! nothing new. Parents must already exist: either in this block or in an
//! earlier committed one.

use dbs_common::types::File;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::debug;

use super::error::{IngestError, IngestResult};
use super::resolver::{lookup_id, require_id};
use super::tables::Table;
use crate::db::executor::execute;
use crate::statements::StatementProvider;

const FILE_PARENTS: &str = "ingest.linkage.file_parents";
const DATASET_PARENTS: &str = "ingest.linkage.dataset_parents";
const DATASET_CONFIGS: &str = "ingest.linkage.dataset_output_configs";
const FILE_CONFIGS: &str = "ingest.linkage.file_output_configs";

/// Links to write once files and lumis are in place.
#[derive(Debug, Default)]
pub struct LinkPlan {
    /// `(child lfn, parent lfn)` pairs from the files and the top-level list.
    pub file_parents: Vec<(String, String)>,
    pub dataset_parents: Vec<String>,
    /// Resolved output module config ids of the dataset.
    pub dataset_configs: Vec<i64>,
    /// `(lfn, output module config id)` pairs.
    pub file_configs: Vec<(String, i64)>,
}

impl LinkPlan {
    /// Collect file parent pairs, per-file entries first, without duplicates.
    pub fn file_parent_pairs(files: &[File], top_level: &[(String, String)]) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        files
            .iter()
            .flat_map(|f| {
                f.file_parent_list
                    .iter()
                    .map(|p| (f.logical_file_name.clone(), p.parent_logical_file_name.clone()))
            })
            .chain(top_level.iter().cloned())
            .filter(|pair| seen.insert(pair.clone()))
            .collect()
    }
}

/// Counts reported back to the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounts {
    pub file_parents: u64,
    pub dataset_parents: u64,
    pub dataset_configs: u64,
    pub file_configs: u64,
}

pub struct LinkWriter<'a> {
    statements: &'a dyn StatementProvider,
    file_ids: &'a HashMap<String, i64>,
}

impl<'a> LinkWriter<'a> {
    pub fn new(statements: &'a dyn StatementProvider, file_ids: &'a HashMap<String, i64>) -> Self {
        Self { statements, file_ids }
    }

    pub async fn write(&self, conn: &mut PgConnection, dataset_id: i64, plan: &LinkPlan) -> IngestResult<LinkCounts> {
        let counts = LinkCounts {
            file_parents: self.file_parents(conn, &plan.file_parents).await?,
            dataset_parents: self.dataset_parents(conn, dataset_id, &plan.dataset_parents).await?,
            dataset_configs: self.dataset_configs(conn, dataset_id, &plan.dataset_configs).await?,
            file_configs: self.file_configs(conn, &plan.file_configs).await?,
        };
        debug!(?counts, "Wrote block links");
        Ok(counts)
    }

    /// Id of a file in this block, else of an already committed file.
    async fn file_id(
        &self,
        conn: &mut PgConnection,
        function: &'static str,
        lfn: &str,
    ) -> IngestResult<i64> {
        if let Some(id) = self.file_ids.get(lfn) {
            return Ok(*id);
        }
        require_id(conn, self.statements, function, Table::Files, &[lfn.into()]).await
    }

    async fn link(
        &self,
        conn: &mut PgConnection,
        function: &'static str,
        name: &str,
        entity: &'static str,
        ids: (i64, i64),
    ) -> IngestResult<u64> {
        let sql = self
            .statements
            .statement(name)
            .map_err(|e| IngestError::statement(function, e))?;
        execute(conn, &sql, &[ids.0.into(), ids.1.into()])
            .await
            .map_err(|source| IngestError::Insert {
                function,
                entity,
                key: format!("{}/{}", ids.0, ids.1),
                source,
            })
    }

    async fn file_parents(&self, conn: &mut PgConnection, pairs: &[(String, String)]) -> IngestResult<u64> {
        let mut written = 0;
        for (child, parent) in pairs {
            let child_id = self.file_id(conn, FILE_PARENTS, child).await?;
            let parent_id = self.file_id(conn, FILE_PARENTS, parent).await?;
            written += self
                .link(conn, FILE_PARENTS, "file_parents.insert", "file parent", (child_id, parent_id))
                .await?;
        }
        Ok(written)
    }

    async fn dataset_parents(&self, conn: &mut PgConnection, dataset_id: i64, parents: &[String]) -> IngestResult<u64> {
        let mut written = 0;
        for parent in parents {
            let parent_id = lookup_id(conn, self.statements, DATASET_PARENTS, Table::Datasets, &[parent.into()])
                .await?
                .ok_or_else(|| IngestError::missing_id(DATASET_PARENTS, "parent dataset", parent))?;
            written += self
                .link(conn, DATASET_PARENTS, "dataset_parents.insert", "dataset parent", (dataset_id, parent_id))
                .await?;
        }
        Ok(written)
    }

    async fn dataset_configs(&self, conn: &mut PgConnection, dataset_id: i64, configs: &[i64]) -> IngestResult<u64> {
        let mut written = 0;
        for config_id in configs {
            written += self
                .link(
                    conn,
                    DATASET_CONFIGS,
                    "dataset_output_mod_configs.insert",
                    "dataset output config",
                    (dataset_id, *config_id),
                )
                .await?;
        }
        Ok(written)
    }

    async fn file_configs(&self, conn: &mut PgConnection, configs: &[(String, i64)]) -> IngestResult<u64> {
        let mut written = 0;
        for (lfn, config_id) in configs {
            let file_id = self.file_id(conn, FILE_CONFIGS, lfn).await?;
            written += self
                .link(
                    conn,
                    FILE_CONFIGS,
                    "file_output_mod_configs.insert",
                    "file output config",
                    (file_id, *config_id),
                )
                .await?;
        }
        Ok(written)
    }
}
