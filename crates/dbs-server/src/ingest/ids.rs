//! Surrogate id reservation
//!
//! Two interchangeable strategies, chosen once at startup:
//!
//! - [`MaxIdAllocator`] reads `MAX(id)` under a transaction-scoped advisory
//!   lock and hands out the next `count` values. Concurrent reservations on the
//!   same table wait for the holder's transaction to end.
//! - [`SequenceAllocator`] draws `count` values from the table's sequence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::sync::Arc;

use super::error::{IngestError, IngestResult};
use super::tables::Table;
use crate::db::executor::{execute, fetch_id};
use crate::statements::StatementProvider;

const FUNCTION: &str = "ingest.ids.allocate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    MaxId,
    Sequence,
}

impl std::str::FromStr for IdStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max_id" | "max" => Ok(IdStrategy::MaxId),
            "sequence" | "seq" => Ok(IdStrategy::Sequence),
            _ => Err(anyhow::anyhow!("Invalid id strategy: {}", s)),
        }
    }
}

impl IdStrategy {
    pub fn allocator(self, statements: Arc<dyn StatementProvider>) -> Arc<dyn IdAllocator> {
        match self {
            IdStrategy::MaxId => Arc::new(MaxIdAllocator::new(statements)),
            IdStrategy::Sequence => Arc::new(SequenceAllocator::new(statements)),
        }
    }
}

/// Reserves surrogate ids for new rows.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    fn strategy(&self) -> IdStrategy;

    /// Reserve `count` ids for `table`, increasing within the call.
    ///
    /// Runs on the caller's connection so reservations made inside a
    /// transaction share its fate.
    async fn allocate(
        &self,
        conn: &mut PgConnection,
        table: Table,
        count: usize,
    ) -> IngestResult<Vec<i64>>;
}

fn id_error(table: Table, source: sqlx::Error) -> IngestError {
    IngestError::GetId {
        function: FUNCTION,
        entity: table.entity(),
        key: table.sequence(),
        source,
    }
}

pub struct MaxIdAllocator {
    statements: Arc<dyn StatementProvider>,
}

impl MaxIdAllocator {
    pub fn new(statements: Arc<dyn StatementProvider>) -> Self {
        Self { statements }
    }
}

#[async_trait]
impl IdAllocator for MaxIdAllocator {
    fn strategy(&self) -> IdStrategy {
        IdStrategy::MaxId
    }

    async fn allocate(
        &self,
        conn: &mut PgConnection,
        table: Table,
        count: usize,
    ) -> IngestResult<Vec<i64>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let lock = self
            .statements
            .statement("ids.lock")
            .map_err(|e| IngestError::statement(FUNCTION, e))?;
        let max = self
            .statements
            .render(
                "ids.max",
                &[("table", table.name()), ("id_column", table.id_column())],
            )
            .map_err(|e| IngestError::statement(FUNCTION, e))?;

        execute(&mut *conn, &lock, &[table.name().into()])
            .await
            .map_err(|e| id_error(table, e))?;
        let current = fetch_id(&mut *conn, &max, &[])
            .await
            .map_err(|e| id_error(table, e))?
            .unwrap_or(0);

        let count = count as i64;
        Ok((1..=count).map(|offset| current + offset).collect())
    }
}

pub struct SequenceAllocator {
    statements: Arc<dyn StatementProvider>,
}

impl SequenceAllocator {
    pub fn new(statements: Arc<dyn StatementProvider>) -> Self {
        Self { statements }
    }
}

#[async_trait]
impl IdAllocator for SequenceAllocator {
    fn strategy(&self) -> IdStrategy {
        IdStrategy::Sequence
    }

    async fn allocate(
        &self,
        conn: &mut PgConnection,
        table: Table,
        count: usize,
    ) -> IngestResult<Vec<i64>> {
        let sequence = table.sequence();
        let sql = self
            .statements
            .render("ids.nextval", &[("sequence", &sequence)])
            .map_err(|e| IngestError::statement(FUNCTION, e))?;

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = fetch_id(&mut *conn, &sql, &[])
                .await
                .map_err(|e| id_error(table, e))?
                .ok_or_else(|| IngestError::missing_id(FUNCTION, table.entity(), &sequence))?;
            ids.push(id);
        }

        Ok(ids)
    }
}
