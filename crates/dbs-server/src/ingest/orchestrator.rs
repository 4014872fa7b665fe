//! Bulk block ingestion
//!
//! Drives one submission through a fixed sequence of states:
//!
//! ```text
//! Validating -> ResolvingDependencies -> InsertingBlock -> InsertingFiles
//!            -> InsertingLumis -> LinkingParents -> Committed
//! ```
//!
//! Any error moves the submission to `Failed`. Reference entities are
//! resolved and committed before the block transaction opens, so they
//! survive a failed submission. Everything from the block row onward is
//! written in one transaction and commits or rolls back as a whole.

use dbs_common::types::{Block, BulkBlock, BulkBlockParts, DatasetConfig, File, FileConfig};
use sqlx::{PgConnection, PgPool, Row};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::IngestConfig;
use super::error::{IngestError, IngestResult};
use super::files::{FileBatch, FileBatchContext, FileBatchInserter};
use super::ids::IdAllocator;
use super::linkage::{LinkCounts, LinkPlan, LinkWriter};
use super::lumis::LumiStrategySelector;
use super::records::{DatasetRefs, OutputConfigRefs, ReferenceRecord, SubmissionDefaults};
use super::resolver::Resolver;
use super::tables::Table;
use super::transaction::BlockTransaction;
use crate::db::executor::{execute, fetch_row, SqlValue};
use crate::statements::StatementProvider;

const INSERT_BULK_BLOCK: &str = "ingest.orchestrator.insert_bulk_block";
const VALIDATE: &str = "ingest.orchestrator.validate";
const RESOLVE: &str = "ingest.orchestrator.resolve_dependencies";
const INSERT_BLOCK: &str = "ingest.orchestrator.insert_block";
const INSERT_LUMIS: &str = "ingest.orchestrator.insert_lumis";
const LINK: &str = "ingest.orchestrator.link_parents";

/// Submitter recorded when neither the request nor the block names one.
pub const UNKNOWN_SUBMITTER: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Validating,
    ResolvingDependencies,
    InsertingBlock,
    InsertingFiles,
    InsertingLumis,
    LinkingParents,
    Committed,
    Failed,
}

impl IngestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IngestState::Committed | IngestState::Failed)
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestState::Validating => "validating",
            IngestState::ResolvingDependencies => "resolving_dependencies",
            IngestState::InsertingBlock => "inserting_block",
            IngestState::InsertingFiles => "inserting_files",
            IngestState::InsertingLumis => "inserting_lumis",
            IngestState::LinkingParents => "linking_parents",
            IngestState::Committed => "committed",
            IngestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Logs every state change of one submission.
struct Progress {
    state: IngestState,
    block: String,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: IngestState::Validating,
            block: String::new(),
        }
    }

    fn enter(&mut self, next: IngestState) {
        info!(block = %self.block, from = %self.state, to = %next, "Bulk block state changed");
        self.state = next;
    }

    fn fail(&mut self, err: &IngestError) {
        if self.state.is_terminal() {
            return;
        }
        error!(
            block = %self.block,
            state = %self.state,
            function = err.function(),
            error = %err,
            "Bulk block ingestion failed"
        );
        self.state = IngestState::Failed;
    }
}

/// Summary of a committed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub block_id: i64,
    pub block_name: String,
    pub dataset_id: i64,
    pub block_created: bool,
    pub files_inserted: usize,
    pub files_reused: usize,
    pub lumis_written: u64,
    pub links: LinkCounts,
}

/// Ids resolved before the block transaction opens.
struct Dependencies {
    dataset_id: i64,
    dataset_configs: Vec<i64>,
    file_configs: Vec<(String, i64)>,
    file_types: HashMap<String, i64>,
}

/// Fields shared by dataset and file output module configs.
struct OutputConfigFields<'a> {
    app_name: &'a str,
    release_version: &'a str,
    pset_hash: &'a str,
    pset_name: Option<&'a String>,
    label: &'a str,
    global_tag: &'a str,
    scenario: Option<&'a String>,
}

impl OutputConfigFields<'_> {
    fn cache_key(&self) -> String {
        [self.app_name, self.release_version, self.pset_hash, self.label, self.global_tag].join("/")
    }
}

impl<'a> From<&'a DatasetConfig> for OutputConfigFields<'a> {
    fn from(c: &'a DatasetConfig) -> Self {
        Self {
            app_name: &c.app_name,
            release_version: &c.release_version,
            pset_hash: &c.pset_hash,
            pset_name: c.pset_name.as_ref(),
            label: &c.output_module_label,
            global_tag: &c.global_tag,
            scenario: c.scenario.as_ref(),
        }
    }
}

impl<'a> From<&'a FileConfig> for OutputConfigFields<'a> {
    fn from(c: &'a FileConfig) -> Self {
        Self {
            app_name: &c.app_name,
            release_version: &c.release_version,
            pset_hash: &c.pset_hash,
            pset_name: c.pset_name.as_ref(),
            label: &c.output_module_label,
            global_tag: &c.global_tag,
            scenario: c.scenario.as_ref(),
        }
    }
}

fn ensure_live(cancel: &CancellationToken, function: &'static str) -> IngestResult<()> {
    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled { function });
    }
    Ok(())
}

fn submitter_name(submitter: Option<&str>, block: &Block) -> String {
    submitter
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| block.create_by.clone().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| UNKNOWN_SUBMITTER.to_string())
}

pub struct BulkIngestor {
    pool: PgPool,
    statements: Arc<dyn StatementProvider>,
    ids: Arc<dyn IdAllocator>,
    resolver: Resolver,
    files: FileBatchInserter,
    lumis: LumiStrategySelector,
    timeout: Duration,
}

impl BulkIngestor {
    pub fn new(pool: PgPool, statements: Arc<dyn StatementProvider>, config: &IngestConfig) -> Self {
        let ids = config.id_strategy.allocator(statements.clone());
        Self {
            resolver: Resolver::new(pool.clone(), statements.clone(), ids.clone(), config.resolve_attempts),
            files: FileBatchInserter::new(
                statements.clone(),
                ids.clone(),
                config.file_chunk_size,
                config.max_concurrent_units,
            ),
            lumis: LumiStrategySelector::from_config(statements.clone(), config),
            timeout: config.submission_timeout(),
            pool,
            statements,
            ids,
        }
    }

    /// Ingest one bulk block within the configured time budget.
    ///
    /// On expiry the in-flight stage is dropped wherever it is waiting,
    /// which rolls back the block transaction.
    #[tracing::instrument(skip_all, fields(submission = %uuid::Uuid::new_v4(), files = submission.files.len()))]
    pub async fn insert_bulk_block(
        &self,
        submission: BulkBlock,
        submitter: Option<&str>,
    ) -> IngestResult<IngestReport> {
        let cancel = CancellationToken::new();
        tokio::select! {
            result = self.insert_bulk_block_until(submission, submitter, &cancel) => result,
            () = tokio::time::sleep(self.timeout) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Bulk block submission timed out, rolling back"
                );
                Err(IngestError::Cancelled { function: INSERT_BULK_BLOCK })
            },
        }
    }

    /// Ingest one bulk block until `cancel` fires. A cancelled submission
    /// stops immediately, even inside a statement, and rolls back.
    pub async fn insert_bulk_block_until(
        &self,
        mut submission: BulkBlock,
        submitter: Option<&str>,
        cancel: &CancellationToken,
    ) -> IngestResult<IngestReport> {
        let mut progress = Progress::new();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(IngestError::Cancelled { function: INSERT_BULK_BLOCK }),
            result = self.run(&mut progress, &mut submission, submitter, cancel) => result,
        };
        if let Err(e) = &result {
            progress.fail(e);
        }
        result
    }

    async fn run(
        &self,
        progress: &mut Progress,
        submission: &mut BulkBlock,
        submitter: Option<&str>,
        cancel: &CancellationToken,
    ) -> IngestResult<IngestReport> {
        let parts = submission
            .validate()
            .map_err(|e| IngestError::validation(VALIDATE, e))?;
        let block = parts.block.clone();
        progress.block = block.block_name.clone();
        let defaults = SubmissionDefaults::new(submitter_name(submitter, &block));

        progress.enter(IngestState::ResolvingDependencies);
        ensure_live(cancel, RESOLVE)?;
        let deps = self
            .resolve_dependencies(&parts, submission, &defaults, cancel)
            .await?;

        let block_size = submission.total_file_size();
        let files = Arc::new(std::mem::take(&mut submission.files));
        let top_level_parents: Vec<(String, String)> = submission
            .file_parent_list
            .iter()
            .map(|l| (l.logical_file_name.clone(), l.parent_logical_file_name.clone()))
            .collect();
        let plan = LinkPlan {
            file_parents: LinkPlan::file_parent_pairs(&files, &top_level_parents),
            dataset_parents: std::mem::take(&mut submission.dataset_parent_list),
            dataset_configs: deps.dataset_configs.clone(),
            file_configs: deps.file_configs.clone(),
        };

        progress.enter(IngestState::InsertingBlock);
        ensure_live(cancel, INSERT_BLOCK)?;
        let tx = BlockTransaction::begin(&self.pool).await?;
        match self
            .write_block(progress, &tx, &block, files, block_size, &deps, &plan, &defaults, cancel)
            .await
        {
            Ok(report) => {
                tx.commit().await?;
                progress.enter(IngestState::Committed);
                Ok(report)
            },
            Err(e) => {
                progress.fail(&e);
                tx.rollback().await;
                Err(e)
            },
        }
    }

    async fn resolve_dependencies(
        &self,
        parts: &BulkBlockParts<'_>,
        submission: &BulkBlock,
        d: &SubmissionDefaults,
        cancel: &CancellationToken,
    ) -> IngestResult<Dependencies> {
        let r = &self.resolver;
        let dataset = parts.dataset;

        let primary_ds_type_id = r
            .resolve_or_create(&ReferenceRecord::primary_ds_type(&parts.primds.primary_ds_type))
            .await?;
        let primary_ds_id = r
            .resolve_or_create(&ReferenceRecord::primary_dataset(parts.primds, primary_ds_type_id, d))
            .await?;
        let processing_era_id = r
            .resolve_or_create(&ReferenceRecord::processing_era(parts.processing_era, d))
            .await?;
        let acquisition_era_id = r
            .resolve_or_create(&ReferenceRecord::acquisition_era(parts.acquisition_era, d))
            .await?;
        let data_tier_id = r
            .resolve_or_create(&ReferenceRecord::data_tier(&dataset.data_tier_name, d))
            .await?;
        let physics_group_id = match dataset.physics_group_name.as_deref().filter(|s| !s.is_empty()) {
            Some(name) => Some(r.resolve_or_create(&ReferenceRecord::physics_group(name)).await?),
            None => None,
        };
        let dataset_access_type_id = r
            .resolve_or_create(&ReferenceRecord::dataset_access_type(&dataset.dataset_access_type))
            .await?;
        let processed_ds_id = r
            .resolve_or_create(&ReferenceRecord::processed_dataset(&dataset.processed_ds_name))
            .await?;
        ensure_live(cancel, RESOLVE)?;

        let refs = DatasetRefs {
            primary_ds_id,
            processed_ds_id,
            data_tier_id,
            dataset_access_type_id,
            acquisition_era_id,
            processing_era_id,
            physics_group_id,
        };
        let dataset_id = r
            .resolve_or_create(&ReferenceRecord::dataset(dataset, refs, d))
            .await?;

        let mut cache = HashMap::new();
        let mut dataset_configs = Vec::with_capacity(submission.dataset_conf_list.len());
        for conf in &submission.dataset_conf_list {
            let id = self.resolve_output_config(conf.into(), d, &mut cache).await?;
            if !dataset_configs.contains(&id) {
                dataset_configs.push(id);
            }
        }
        let mut file_configs = Vec::with_capacity(submission.file_conf_list.len());
        for conf in &submission.file_conf_list {
            ensure_live(cancel, RESOLVE)?;
            let id = self.resolve_output_config(conf.into(), d, &mut cache).await?;
            file_configs.push((conf.logical_file_name.clone(), id));
        }

        let file_types = FileBatchInserter::resolve_file_types(r, &submission.files).await?;

        info!(
            dataset_id,
            output_configs = cache.len(),
            file_types = file_types.len(),
            "Resolved bulk block dependencies"
        );

        Ok(Dependencies {
            dataset_id,
            dataset_configs,
            file_configs,
            file_types,
        })
    }

    async fn resolve_output_config(
        &self,
        fields: OutputConfigFields<'_>,
        d: &SubmissionDefaults,
        cache: &mut HashMap<String, i64>,
    ) -> IngestResult<i64> {
        let key = fields.cache_key();
        if let Some(id) = cache.get(&key) {
            return Ok(*id);
        }

        let r = &self.resolver;
        let refs = OutputConfigRefs {
            app_exec_id: r
                .resolve_or_create(&ReferenceRecord::app_executable(fields.app_name))
                .await?,
            release_version_id: r
                .resolve_or_create(&ReferenceRecord::release_version(fields.release_version))
                .await?,
            parameter_set_hash_id: r
                .resolve_or_create(&ReferenceRecord::parameter_set_hash(fields.pset_hash, fields.pset_name))
                .await?,
        };
        let id = r
            .resolve_or_create(&ReferenceRecord::output_module_config(
                refs,
                fields.label,
                fields.global_tag,
                fields.scenario,
                d,
            ))
            .await?;
        cache.insert(key, id);
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_block(
        &self,
        progress: &mut Progress,
        tx: &BlockTransaction,
        block: &Block,
        files: Arc<Vec<File>>,
        block_size: i64,
        deps: &Dependencies,
        plan: &LinkPlan,
        defaults: &SubmissionDefaults,
        cancel: &CancellationToken,
    ) -> IngestResult<IngestReport> {
        let file_count = files.len() as i64;
        let (block_id, block_created) = {
            let mut guard = tx.lock().await;
            self.insert_block(&mut guard, block, deps.dataset_id, file_count, block_size, defaults)
                .await?
        };

        progress.enter(IngestState::InsertingFiles);
        let batch = self
            .files
            .insert_files(
                tx,
                files.clone(),
                FileBatchContext {
                    dataset_id: deps.dataset_id,
                    block_id,
                    file_types: deps.file_types.clone(),
                    defaults: defaults.clone(),
                },
                cancel,
            )
            .await?;

        progress.enter(IngestState::InsertingLumis);
        let lumis_written = {
            let mut guard = tx.lock().await;
            self.insert_lumis(&mut guard, &files, &batch, cancel).await?
        };

        progress.enter(IngestState::LinkingParents);
        ensure_live(cancel, LINK)?;
        let links = {
            let mut guard = tx.lock().await;
            LinkWriter::new(self.statements.as_ref(), &batch.ids)
                .write(&mut guard, deps.dataset_id, plan)
                .await?
        };

        Ok(IngestReport {
            block_id,
            block_name: block.block_name.clone(),
            dataset_id: deps.dataset_id,
            block_created,
            files_inserted: batch.inserted,
            files_reused: batch.reused,
            lumis_written,
            links,
        })
    }

    /// Find the block by name or create it. Returns the id and whether it was created.
    async fn insert_block(
        &self,
        conn: &mut PgConnection,
        block: &Block,
        dataset_id: i64,
        file_count: i64,
        block_size: i64,
        d: &SubmissionDefaults,
    ) -> IngestResult<(i64, bool)> {
        let lookup = self
            .statements
            .statement("blocks.get")
            .map_err(|e| IngestError::statement(INSERT_BLOCK, e))?;

        if let Some(block_id) = self.existing_block(conn, &lookup, block, dataset_id).await? {
            info!(block_id, "Reusing existing block");
            return Ok((block_id, false));
        }

        let insert = self
            .statements
            .statement("blocks.insert")
            .map_err(|e| IngestError::statement(INSERT_BLOCK, e))?;
        let block_id = self
            .ids
            .allocate(conn, Table::Blocks, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::missing_id(INSERT_BLOCK, "block", &block.block_name))?;

        let created = d.date(block.creation_date);
        let creator = d.creator(block.create_by.as_ref());
        let values: [SqlValue; 11] = [
            block_id.into(),
            block.block_name.as_str().into(),
            dataset_id.into(),
            block.open_for_writing.unwrap_or(0).into(),
            block.origin_site_name.as_str().into(),
            block_size.into(),
            file_count.into(),
            created.into(),
            creator.clone().into(),
            created.into(),
            creator.into(),
        ];
        let inserted = execute(conn, &insert, &values)
            .await
            .map_err(|source| IngestError::Insert {
                function: INSERT_BLOCK,
                entity: "block",
                key: block.block_name.clone(),
                source,
            })?;

        if inserted == 1 {
            return Ok((block_id, true));
        }

        // Lost the race to a concurrent submission of the same block.
        self.existing_block(conn, &lookup, block, dataset_id)
            .await?
            .map(|id| (id, false))
            .ok_or_else(|| IngestError::missing_id(INSERT_BLOCK, "block", &block.block_name))
    }

    async fn existing_block(
        &self,
        conn: &mut PgConnection,
        lookup: &str,
        block: &Block,
        dataset_id: i64,
    ) -> IngestResult<Option<i64>> {
        let row = fetch_row(conn, lookup, &[block.block_name.as_str().into()])
            .await
            .and_then(|row| {
                row.map(|r| Ok::<_, sqlx::Error>((r.try_get::<i64, _>(0)?, r.try_get::<i64, _>(1)?)))
                    .transpose()
            })
            .map_err(|source| IngestError::GetId {
                function: INSERT_BLOCK,
                entity: "block",
                key: block.block_name.clone(),
                source,
            })?;

        match row {
            Some((block_id, owner)) if owner == dataset_id => Ok(Some(block_id)),
            Some((_, owner)) => Err(IngestError::Conflict {
                function: INSERT_BLOCK,
                entity: "block",
                key: block.block_name.clone(),
                detail: format!("already belongs to dataset {owner}"),
            }),
            None => Ok(None),
        }
    }

    async fn insert_lumis(
        &self,
        conn: &mut PgConnection,
        files: &[File],
        batch: &FileBatch,
        cancel: &CancellationToken,
    ) -> IngestResult<u64> {
        let mut written = 0;
        for file in files {
            ensure_live(cancel, INSERT_LUMIS)?;
            let file_id = batch
                .ids
                .get(&file.logical_file_name)
                .copied()
                .ok_or_else(|| IngestError::missing_id(INSERT_LUMIS, "file", &file.logical_file_name))?;
            written += self.lumis.insert(conn, file_id, &file.file_lumi_list).await?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitter_fallbacks() {
        let mut block = Block::default();
        assert_eq!(submitter_name(Some("alice"), &block), "alice");
        assert_eq!(submitter_name(Some(""), &block), UNKNOWN_SUBMITTER);

        block.create_by = Some("producer".into());
        assert_eq!(submitter_name(None, &block), "producer");
        assert_eq!(submitter_name(Some("alice"), &block), "alice");
    }

    #[test]
    fn test_terminal_states() {
        assert!(IngestState::Committed.is_terminal());
        assert!(IngestState::Failed.is_terminal());
        assert!(!IngestState::LinkingParents.is_terminal());
        assert_eq!(IngestState::ResolvingDependencies.to_string(), "resolving_dependencies");
    }

    #[test]
    fn test_output_config_cache_key_ignores_scenario() {
        let a = DatasetConfig {
            app_name: "cmsRun".into(),
            release_version: "CMSSW_14_0_0".into(),
            pset_hash: "abc".into(),
            output_module_label: "out".into(),
            scenario: Some("pp".into()),
            ..Default::default()
        };
        let b = FileConfig {
            logical_file_name: "/store/a.root".into(),
            app_name: "cmsRun".into(),
            release_version: "CMSSW_14_0_0".into(),
            pset_hash: "abc".into(),
            output_module_label: "out".into(),
            ..Default::default()
        };
        assert_eq!(
            OutputConfigFields::from(&a).cache_key(),
            OutputConfigFields::from(&b).cache_key()
        );
    }
}
