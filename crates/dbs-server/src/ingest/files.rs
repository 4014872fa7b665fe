//! Concurrent file insertion inside the block transaction
//!
//! Ids for every file are reserved up front, so the file at input index `i`
//! always receives `ids[i]` no matter which unit writes it. Files are split
//! into fixed-size chunks; each chunk runs as one unit on a bounded worker
//! pool. Units share the transaction, the `lfn -> id` map and a failure
//! counter. A failing unit stops its own slice; its siblings still finish,
//! and the caller turns a nonzero counter into a rollback.

use dashmap::DashMap;
use dbs_common::types::File;
use sqlx::Row;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{IngestError, IngestResult};
use super::ids::IdAllocator;
use super::records::{ReferenceRecord, SubmissionDefaults};
use super::resolver::Resolver;
use super::tables::Table;
use super::transaction::BlockTransaction;
use crate::db::executor::{execute, fetch_row, SqlValue};
use crate::features::shared::error_helpers::violated_constraint;
use crate::statements::StatementProvider;

const INSERT_FILES: &str = "ingest.files.insert_files";
const INSERT_FILE: &str = "ingest.files.insert_file";

/// Identifiers every file row of the block points at.
#[derive(Debug, Clone)]
pub struct FileBatchContext {
    pub dataset_id: i64,
    pub block_id: i64,
    /// File type name to id, resolved once per submission.
    pub file_types: HashMap<String, i64>,
    pub defaults: SubmissionDefaults,
}

/// Outcome of a successful batch.
#[derive(Debug, Default)]
pub struct FileBatch {
    pub ids: HashMap<String, i64>,
    pub inserted: usize,
    pub reused: usize,
}

enum FileOutcome {
    Inserted,
    Reused(i64),
}

pub struct FileBatchInserter {
    statements: Arc<dyn StatementProvider>,
    ids: Arc<dyn IdAllocator>,
    chunk_size: usize,
    max_concurrent_units: usize,
}

impl FileBatchInserter {
    pub fn new(
        statements: Arc<dyn StatementProvider>,
        ids: Arc<dyn IdAllocator>,
        chunk_size: usize,
        max_concurrent_units: usize,
    ) -> Self {
        Self {
            statements,
            ids,
            chunk_size: chunk_size.max(1),
            max_concurrent_units: max_concurrent_units.max(1),
        }
    }

    /// Resolve each distinct file type of the submission exactly once.
    pub async fn resolve_file_types(
        resolver: &Resolver,
        files: &[File],
    ) -> IngestResult<HashMap<String, i64>> {
        let distinct: BTreeSet<&str> = files.iter().map(|f| f.file_type.as_str()).collect();
        let mut types = HashMap::with_capacity(distinct.len());
        for file_type in distinct {
            let id = resolver
                .resolve_or_create(&ReferenceRecord::file_data_type(file_type))
                .await?;
            types.insert(file_type.to_string(), id);
        }
        Ok(types)
    }

    /// Insert all `files` into the block transaction.
    #[tracing::instrument(skip_all, fields(files = files.len(), block_id = context.block_id))]
    pub async fn insert_files(
        &self,
        tx: &BlockTransaction,
        files: Arc<Vec<File>>,
        context: FileBatchContext,
        cancel: &CancellationToken,
    ) -> IngestResult<FileBatch> {
        if files.is_empty() {
            return Ok(FileBatch::default());
        }

        let ids = {
            let mut guard = tx.lock().await;
            self.ids.allocate(&mut guard, Table::Files, files.len()).await?
        };

        let plan = plan_chunks(files.len(), self.chunk_size);
        let total_units = plan.len();
        let shared = Arc::new(SharedBatch {
            lookup_sql: self
                .statements
                .statement("files.get")
                .map_err(|e| IngestError::statement(INSERT_FILES, e))?,
            insert_sql: self
                .statements
                .statement("files.insert")
                .map_err(|e| IngestError::statement(INSERT_FILES, e))?,
            files,
            ids,
            context,
            tx: tx.clone(),
            ids_by_lfn: DashMap::new(),
            failures: AtomicUsize::new(0),
            first_error: std::sync::Mutex::new(None),
            inserted: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            cancel: cancel.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_units));
        let mut units = JoinSet::new();
        for (unit, range) in plan.into_iter().enumerate() {
            if cancel.is_cancelled() {
                shared.record_failure(unit, &IngestError::Cancelled { function: INSERT_FILES });
                continue;
            }
            let shared = shared.clone();
            let semaphore = semaphore.clone();
            units.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    shared.record_failure(unit, &IngestError::Cancelled { function: INSERT_FILES });
                    return;
                };
                shared.run_unit(unit, range).await;
            });
        }

        // Join barrier: every unit finishes before the outcome is read.
        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                shared.record_failure(usize::MAX, &IngestError::Concurrency {
                    function: INSERT_FILES,
                    failed: 1,
                    total: total_units,
                    first_error: e.to_string(),
                });
            }
        }

        let failed = shared.failures.load(Ordering::Acquire);
        if failed > 0 {
            let first_error = shared
                .first_error
                .lock()
                .ok()
                .and_then(|mut slot| slot.take())
                .unwrap_or_default();
            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled { function: INSERT_FILES });
            }
            return Err(IngestError::Concurrency {
                function: INSERT_FILES,
                failed,
                total: total_units,
                first_error,
            });
        }

        let batch = FileBatch {
            ids: shared
                .ids_by_lfn
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            inserted: shared.inserted.load(Ordering::Acquire),
            reused: shared.reused.load(Ordering::Acquire),
        };

        info!(
            inserted = batch.inserted,
            reused = batch.reused,
            units = total_units,
            "Inserted block files"
        );

        Ok(batch)
    }
}

/// Split `0..total` into consecutive ranges of at most `chunk_size`.
pub(crate) fn plan_chunks(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..total)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(total))
        .collect()
}

struct SharedBatch {
    files: Arc<Vec<File>>,
    ids: Vec<i64>,
    context: FileBatchContext,
    lookup_sql: String,
    insert_sql: String,
    tx: BlockTransaction,
    ids_by_lfn: DashMap<String, i64>,
    failures: AtomicUsize,
    first_error: std::sync::Mutex<Option<String>>,
    inserted: AtomicUsize,
    reused: AtomicUsize,
    cancel: CancellationToken,
}

impl SharedBatch {
    async fn run_unit(&self, unit: usize, range: Range<usize>) {
        if self.cancel.is_cancelled() {
            self.record_failure(unit, &IngestError::Cancelled { function: INSERT_FILES });
            return;
        }

        debug!(unit, start = range.start, end = range.end, "File unit started");
        for index in range {
            let file = &self.files[index];
            let id = self.ids[index];
            match self.insert_file(file, id).await {
                Ok(FileOutcome::Inserted) => {
                    self.ids_by_lfn.insert(file.logical_file_name.clone(), id);
                    self.inserted.fetch_add(1, Ordering::AcqRel);
                },
                Ok(FileOutcome::Reused(existing)) => {
                    self.ids_by_lfn.insert(file.logical_file_name.clone(), existing);
                    self.reused.fetch_add(1, Ordering::AcqRel);
                },
                Err(e) => {
                    self.record_failure(unit, &e);
                    return;
                },
            }
        }
    }

    async fn insert_file(&self, file: &File, id: i64) -> IngestResult<FileOutcome> {
        let lfn = &file.logical_file_name;
        let ctx = &self.context;
        let file_type_id = ctx
            .file_types
            .get(&file.file_type)
            .copied()
            .ok_or_else(|| IngestError::missing_id(INSERT_FILE, "file data type", &file.file_type))?;

        let mut tx = self.tx.lock().await;

        let existing = fetch_row(&mut tx, &self.lookup_sql, &[lfn.into()])
            .await
            .and_then(|row| {
                row.map(|r| Ok::<_, sqlx::Error>((r.try_get::<i64, _>(0)?, r.try_get::<i64, _>(1)?)))
                    .transpose()
            })
            .map_err(|source| IngestError::GetId {
                function: INSERT_FILE,
                entity: "file",
                key: lfn.clone(),
                source,
            })?;
        if let Some((file_id, block_id)) = existing {
            if block_id != ctx.block_id {
                return Err(IngestError::Conflict {
                    function: INSERT_FILE,
                    entity: "file",
                    key: lfn.clone(),
                    detail: format!("already belongs to block {block_id}"),
                });
            }
            return Ok(FileOutcome::Reused(file_id));
        }

        let created = ctx.defaults.date(file.creation_date);
        let creator = ctx.defaults.creator(file.create_by.as_ref());
        let values: [SqlValue; 16] = [
            id.into(),
            lfn.into(),
            file.is_file_valid.unwrap_or(1).into(),
            ctx.dataset_id.into(),
            ctx.block_id.into(),
            file_type_id.into(),
            file.check_sum.clone().into(),
            file.event_count.into(),
            file.file_size.into(),
            file.adler32.clone().into(),
            file.md5.clone().into(),
            file.auto_cross_section.into(),
            created.into(),
            creator.clone().into(),
            file.last_modification_date.unwrap_or(created).into(),
            file.last_modified_by.clone().unwrap_or(creator).into(),
        ];

        execute(&mut tx, &self.insert_sql, &values)
            .await
            .map_err(|source| {
                warn!(
                    lfn = %lfn,
                    constraint = violated_constraint(&source).unwrap_or("-"),
                    "File insert rejected"
                );
                IngestError::Insert {
                    function: INSERT_FILE,
                    entity: "file",
                    key: lfn.clone(),
                    source,
                }
            })?;

        Ok(FileOutcome::Inserted)
    }

    fn record_failure(&self, unit: usize, error: &IngestError) {
        let failed = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
        warn!(unit, failed, error = %error, "File unit failed");
        if let Ok(mut slot) = self.first_error.lock() {
            slot.get_or_insert_with(|| error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plan_chunks_examples() {
        assert_eq!(plan_chunks(0, 50), Vec::<Range<usize>>::new());
        assert_eq!(plan_chunks(120, 50), vec![0..50, 50..100, 100..120]);
        assert_eq!(plan_chunks(3, 0), vec![0..1, 1..2, 2..3]);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_inputs_in_order(total in 0usize..2_000, chunk in 1usize..200) {
            let plan = plan_chunks(total, chunk);
            let mut next = 0;
            for range in &plan {
                prop_assert_eq!(range.start, next);
                prop_assert!(range.end > range.start);
                prop_assert!(range.len() <= chunk);
                next = range.end;
            }
            prop_assert_eq!(next, total);
        }

        #[test]
        fn prop_file_index_keeps_its_reserved_id(total in 1usize..500, chunk in 1usize..64, base in 0i64..1_000_000) {
            let ids: Vec<i64> = (0..total as i64).map(|i| base + 1 + i).collect();
            for range in plan_chunks(total, chunk) {
                for index in range {
                    prop_assert_eq!(ids[index], base + 1 + index as i64);
                }
            }
        }
    }
}
