//! Get-or-create for natural-key entities
//!
//! Each creation runs in its own short transaction and commits on its own, so
//! a later failure of the submission leaves resolved entities in place. A
//! unique violation on insert means another caller created the row first; the
//! resolver rolls back and looks it up again.

use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::debug;

use super::error::{IngestError, IngestResult};
use super::ids::IdAllocator;
use super::records::ReferenceRecord;
use super::tables::Table;
use crate::db::executor::{display_key, execute, fetch_id, SqlValue};
use crate::features::shared::error_helpers::is_unique_violation;
use crate::statements::StatementProvider;

const RESOLVE: &str = "ingest.resolver.resolve_or_create";
const LOOKUP: &str = "ingest.resolver.lookup";

enum CreateOutcome {
    Created(i64),
    Raced,
}

#[derive(Clone)]
pub struct Resolver {
    pool: PgPool,
    statements: Arc<dyn StatementProvider>,
    ids: Arc<dyn IdAllocator>,
    max_attempts: u32,
}

impl Resolver {
    pub fn new(
        pool: PgPool,
        statements: Arc<dyn StatementProvider>,
        ids: Arc<dyn IdAllocator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            pool,
            statements,
            ids,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Return the id for `record`'s natural key, creating the row if needed.
    #[tracing::instrument(skip(self, record), fields(table = %record.table, key = %record.display_key()))]
    pub async fn resolve_or_create(&self, record: &ReferenceRecord) -> IngestResult<i64> {
        let lookup = self
            .statements
            .statement(&record.table.get_id_statement())
            .map_err(|e| IngestError::statement(RESOLVE, e))?;
        let insert = self
            .statements
            .statement(&record.table.insert_statement())
            .map_err(|e| IngestError::statement(RESOLVE, e))?;

        for attempt in 1..=self.max_attempts {
            if let Some(id) = self.lookup_on_pool(&lookup, record).await? {
                return Ok(id);
            }

            match self.create(&insert, record).await? {
                CreateOutcome::Created(id) => {
                    debug!(id, "Created reference entity");
                    return Ok(id);
                },
                CreateOutcome::Raced => {
                    debug!(attempt, "Entity created concurrently, looking it up again");
                },
            }
        }

        self.lookup_on_pool(&lookup, record)
            .await?
            .ok_or_else(|| IngestError::missing_id(RESOLVE, record.table.entity(), record.display_key()))
    }

    async fn lookup_on_pool(&self, sql: &str, record: &ReferenceRecord) -> IngestResult<Option<i64>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| IngestError::transaction(LOOKUP, e))?;
        fetch_id(&mut conn, sql, &record.key)
            .await
            .map_err(|source| IngestError::GetId {
                function: LOOKUP,
                entity: record.table.entity(),
                key: record.display_key(),
                source,
            })
    }

    async fn create(&self, sql: &str, record: &ReferenceRecord) -> IngestResult<CreateOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestError::transaction(RESOLVE, e))?;

        let id = self
            .ids
            .allocate(&mut tx, record.table, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::missing_id(RESOLVE, record.table.entity(), record.table.sequence()))?;

        let mut values = Vec::with_capacity(record.values.len() + 1);
        values.push(SqlValue::from(id));
        values.extend(record.values.iter().cloned());

        match execute(&mut tx, sql, &values).await {
            Ok(_) => {
                tx.commit()
                    .await
                    .map_err(|e| IngestError::transaction(RESOLVE, e))?;
                Ok(CreateOutcome::Created(id))
            },
            Err(e) if is_unique_violation(&e) => {
                tx.rollback()
                    .await
                    .map_err(|e| IngestError::transaction(RESOLVE, e))?;
                Ok(CreateOutcome::Raced)
            },
            Err(source) => Err(IngestError::Insert {
                function: RESOLVE,
                entity: record.table.entity(),
                key: record.display_key(),
                source,
            }),
        }
    }
}

/// Look up an existing id by natural key on the given connection.
pub async fn lookup_id(
    conn: &mut PgConnection,
    statements: &dyn StatementProvider,
    function: &'static str,
    table: Table,
    key: &[SqlValue],
) -> IngestResult<Option<i64>> {
    let sql = statements
        .statement(&table.get_id_statement())
        .map_err(|e| IngestError::statement(function, e))?;
    fetch_id(conn, &sql, key)
        .await
        .map_err(|source| IngestError::GetId {
            function,
            entity: table.entity(),
            key: display_key(key),
            source,
        })
}

/// Like [`lookup_id`], but a missing row is an error.
pub async fn require_id(
    conn: &mut PgConnection,
    statements: &dyn StatementProvider,
    function: &'static str,
    table: Table,
    key: &[SqlValue],
) -> IngestResult<i64> {
    lookup_id(conn, statements, function, table, key)
        .await?
        .ok_or_else(|| IngestError::missing_id(function, table.entity(), display_key(key)))
}
