//! Lumi-section insertion strategies
//!
//! Small lists go through the sequential path. Lists above the threshold use
//! the configured bulk strategy: multi-row `VALUES` chunks, or a staging
//! temp table merged into `file_lumis` with one set-based insert. All three
//! are duplicate-safe, so resubmitting a block never duplicates a lumi row.

use async_trait::async_trait;
use dbs_common::types::FileLumi;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::debug;

use super::config::IngestConfig;
use super::error::{IngestError, IngestResult};
use crate::db::executor::{execute, fetch_id};
use crate::statements::StatementProvider;

const SEQUENTIAL: &str = "ingest.lumis.insert_sequential";
const CHUNKED: &str = "ingest.lumis.insert_chunked";
const STAGING: &str = "ingest.lumis.insert_staging";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LumiStrategy {
    Sequential,
    Chunked,
    Staging,
}

impl std::str::FromStr for LumiStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(LumiStrategy::Sequential),
            "chunked" => Ok(LumiStrategy::Chunked),
            "staging" | "temp" => Ok(LumiStrategy::Staging),
            _ => Err(anyhow::anyhow!("Invalid lumi strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for LumiStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LumiStrategy::Sequential => "sequential",
            LumiStrategy::Chunked => "chunked",
            LumiStrategy::Staging => "staging",
        };
        f.write_str(name)
    }
}

/// Writes one file's lumi list on the block connection.
#[async_trait]
pub trait LumiInserter: Send + Sync {
    fn strategy(&self) -> LumiStrategy;

    /// Insert `lumis` for `file_id`, skipping rows that already exist.
    /// Returns the number of rows actually written.
    async fn insert(&self, conn: &mut PgConnection, file_id: i64, lumis: &[FileLumi]) -> IngestResult<u64>;
}

fn lumi_key(file_id: i64, lumi: &FileLumi) -> String {
    format!("{file_id}/{}/{}", lumi.run_num, lumi.lumi_section_num)
}

/// Existence check then single-row insert, one pair of round trips per lumi.
pub struct SequentialLumiInserter {
    statements: Arc<dyn StatementProvider>,
}

impl SequentialLumiInserter {
    pub fn new(statements: Arc<dyn StatementProvider>) -> Self {
        Self { statements }
    }
}

#[async_trait]
impl LumiInserter for SequentialLumiInserter {
    fn strategy(&self) -> LumiStrategy {
        LumiStrategy::Sequential
    }

    async fn insert(&self, conn: &mut PgConnection, file_id: i64, lumis: &[FileLumi]) -> IngestResult<u64> {
        let exists = self
            .statements
            .statement("file_lumis.exists")
            .map_err(|e| IngestError::statement(SEQUENTIAL, e))?;
        let insert = self
            .statements
            .statement("file_lumis.insert")
            .map_err(|e| IngestError::statement(SEQUENTIAL, e))?;

        let mut written = 0;
        for lumi in lumis {
            let found = fetch_id(
                conn,
                &exists,
                &[file_id.into(), lumi.run_num.into(), lumi.lumi_section_num.into()],
            )
            .await
            .map_err(|source| IngestError::GetId {
                function: SEQUENTIAL,
                entity: "file lumi",
                key: lumi_key(file_id, lumi),
                source,
            })?;
            if found.is_some() {
                continue;
            }

            written += execute(
                conn,
                &insert,
                &[
                    lumi.run_num.into(),
                    lumi.lumi_section_num.into(),
                    file_id.into(),
                    lumi.event_count.into(),
                ],
            )
            .await
            .map_err(|source| IngestError::Insert {
                function: SEQUENTIAL,
                entity: "file lumi",
                key: lumi_key(file_id, lumi),
                source,
            })?;
        }
        Ok(written)
    }
}

/// Multi-row `INSERT ... VALUES` per chunk with `ON CONFLICT DO NOTHING`.
pub struct ChunkedLumiInserter {
    statements: Arc<dyn StatementProvider>,
    chunk_size: usize,
}

impl ChunkedLumiInserter {
    pub fn new(statements: Arc<dyn StatementProvider>, chunk_size: usize) -> Self {
        Self {
            statements,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl LumiInserter for ChunkedLumiInserter {
    fn strategy(&self) -> LumiStrategy {
        LumiStrategy::Chunked
    }

    async fn insert(&self, conn: &mut PgConnection, file_id: i64, lumis: &[FileLumi]) -> IngestResult<u64> {
        let prefix = self
            .statements
            .statement("file_lumis.insert_many")
            .map_err(|e| IngestError::statement(CHUNKED, e))?;
        let suffix = self
            .statements
            .statement("file_lumis.on_conflict")
            .map_err(|e| IngestError::statement(CHUNKED, e))?;

        let mut written = 0;
        for chunk in lumis.chunks(self.chunk_size) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut row, lumi| {
                row.push_bind(lumi.run_num)
                    .push_bind(lumi.lumi_section_num)
                    .push_bind(file_id)
                    .push_bind(lumi.event_count);
            });
            builder.push(&suffix);

            let result = builder
                .build()
                .execute(&mut *conn)
                .await
                .map_err(|source| IngestError::Insert {
                    function: CHUNKED,
                    entity: "file lumi",
                    key: format!("{file_id}/chunk of {}", chunk.len()),
                    source,
                })?;
            written += result.rows_affected();
        }
        Ok(written)
    }
}

/// Temp table load plus one set-based merge.
pub struct StagingLumiInserter {
    statements: Arc<dyn StatementProvider>,
}

impl StagingLumiInserter {
    pub fn new(statements: Arc<dyn StatementProvider>) -> Self {
        Self { statements }
    }
}

#[async_trait]
impl LumiInserter for StagingLumiInserter {
    fn strategy(&self) -> LumiStrategy {
        LumiStrategy::Staging
    }

    async fn insert(&self, conn: &mut PgConnection, file_id: i64, lumis: &[FileLumi]) -> IngestResult<u64> {
        let stmt = |name: &str| {
            self.statements
                .statement(name)
                .map_err(|e| IngestError::statement(STAGING, e))
        };
        let create = stmt("file_lumis.stage.create")?;
        let clear = stmt("file_lumis.stage.clear")?;
        let load = stmt("file_lumis.stage.load")?;
        let merge = stmt("file_lumis.stage.merge")?;

        let staging_error = |source: sqlx::Error| IngestError::Insert {
            function: STAGING,
            entity: "file lumi",
            key: format!("{file_id}/staging"),
            source,
        };

        execute(conn, &create, &[]).await.map_err(staging_error)?;
        execute(conn, &clear, &[]).await.map_err(staging_error)?;

        let runs: Vec<i64> = lumis.iter().map(|l| l.run_num).collect();
        let sections: Vec<i64> = lumis.iter().map(|l| l.lumi_section_num).collect();
        let events: Vec<Option<i64>> = lumis.iter().map(|l| l.event_count).collect();
        sqlx::query(&load)
            .bind(runs)
            .bind(sections)
            .bind(file_id)
            .bind(events)
            .execute(&mut *conn)
            .await
            .map_err(staging_error)?;

        execute(conn, &merge, &[]).await.map_err(staging_error)
    }
}

/// Picks the inserter for each file's lumi list.
pub struct LumiStrategySelector {
    threshold: usize,
    sequential: SequentialLumiInserter,
    bulk: Box<dyn LumiInserter>,
}

impl LumiStrategySelector {
    pub fn new(statements: Arc<dyn StatementProvider>, strategy: LumiStrategy, threshold: usize, chunk_size: usize) -> Self {
        let bulk: Box<dyn LumiInserter> = match strategy {
            LumiStrategy::Sequential => Box::new(SequentialLumiInserter::new(statements.clone())),
            LumiStrategy::Chunked => Box::new(ChunkedLumiInserter::new(statements.clone(), chunk_size)),
            LumiStrategy::Staging => Box::new(StagingLumiInserter::new(statements.clone())),
        };
        Self {
            threshold,
            sequential: SequentialLumiInserter::new(statements),
            bulk,
        }
    }

    pub fn from_config(statements: Arc<dyn StatementProvider>, config: &IngestConfig) -> Self {
        Self::new(
            statements,
            config.lumi_strategy,
            config.lumi_threshold,
            config.lumi_chunk_size,
        )
    }

    /// Strategy used for a list of `count` lumis.
    pub fn select(&self, count: usize) -> LumiStrategy {
        if count <= self.threshold {
            LumiStrategy::Sequential
        } else {
            self.bulk.strategy()
        }
    }

    pub async fn insert(&self, conn: &mut PgConnection, file_id: i64, lumis: &[FileLumi]) -> IngestResult<u64> {
        if lumis.is_empty() {
            return Ok(0);
        }
        let inserter: &dyn LumiInserter = match self.select(lumis.len()) {
            LumiStrategy::Sequential => &self.sequential,
            LumiStrategy::Chunked | LumiStrategy::Staging => self.bulk.as_ref(),
        };
        let written = inserter.insert(conn, file_id, lumis).await?;
        debug!(
            file_id,
            lumis = lumis.len(),
            written,
            strategy = %inserter.strategy(),
            "Inserted file lumis"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::TemplateStatements;
    use sqlx::PgPool;
    use std::collections::BTreeSet;

    fn statements() -> Arc<dyn StatementProvider> {
        Arc::new(TemplateStatements::builtin(""))
    }

    fn lumis(count: i64) -> Vec<FileLumi> {
        (0..count)
            .map(|i| FileLumi {
                run_num: 1 + i / 10,
                lumi_section_num: i,
                event_count: if i % 3 == 0 { None } else { Some(i * 100) },
            })
            .collect()
    }

    async fn seed_file(pool: &PgPool, file_id: i64) -> sqlx::Result<()> {
        let mut conn = pool.acquire().await?;
        for sql in [
            "INSERT INTO primary_ds_types (primary_ds_type_id, primary_ds_type) VALUES (1, 'test')",
            "INSERT INTO primary_datasets (primary_ds_id, primary_ds_name, primary_ds_type_id) VALUES (1, 'Prim', 1)",
            "INSERT INTO processed_datasets (processed_ds_id, processed_ds_name) VALUES (1, 'Proc-v1')",
            "INSERT INTO data_tiers (data_tier_id, data_tier_name) VALUES (1, 'RAW')",
            "INSERT INTO dataset_access_types (dataset_access_type_id, dataset_access_type) VALUES (1, 'VALID')",
            "INSERT INTO acquisition_eras (acquisition_era_id, acquisition_era_name) VALUES (1, 'Acq')",
            "INSERT INTO processing_eras (processing_era_id, processing_version) VALUES (1, 1)",
            "INSERT INTO datasets (dataset_id, dataset, primary_ds_id, processed_ds_id, data_tier_id, \
             dataset_access_type_id, acquisition_era_id, processing_era_id) \
             VALUES (1, '/Prim/Proc-v1/RAW', 1, 1, 1, 1, 1, 1)",
            "INSERT INTO blocks (block_id, block_name, dataset_id) VALUES (1, '/Prim/Proc-v1/RAW#b1', 1)",
            "INSERT INTO file_data_types (file_type_id, file_type) VALUES (1, 'EDM')",
        ] {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        sqlx::query(
            "INSERT INTO files (file_id, logical_file_name, dataset_id, block_id, file_type_id) \
             VALUES ($1, $2, 1, 1, 1)",
        )
        .bind(file_id)
        .bind(format!("/store/lumi/{file_id}.root"))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn stored(pool: &PgPool, file_id: i64) -> sqlx::Result<BTreeSet<(i64, i64, Option<i64>)>> {
        let rows: Vec<(i64, i64, Option<i64>)> = sqlx::query_as(
            "SELECT run_num, lumi_section_num, event_count FROM file_lumis WHERE file_id = $1",
        )
        .bind(file_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("staging".parse::<LumiStrategy>().unwrap(), LumiStrategy::Staging);
        assert_eq!("CHUNKED".parse::<LumiStrategy>().unwrap(), LumiStrategy::Chunked);
        assert_eq!("sequential".parse::<LumiStrategy>().unwrap(), LumiStrategy::Sequential);
        assert!("bulk".parse::<LumiStrategy>().is_err());
    }

    #[test]
    fn test_threshold_selects_sequential() {
        let selector = LumiStrategySelector::new(statements(), LumiStrategy::Staging, 100, 500);
        assert_eq!(selector.select(0), LumiStrategy::Sequential);
        assert_eq!(selector.select(100), LumiStrategy::Sequential);
        assert_eq!(selector.select(101), LumiStrategy::Staging);

        let chunked = LumiStrategySelector::new(statements(), LumiStrategy::Chunked, 10, 4);
        assert_eq!(chunked.select(11), LumiStrategy::Chunked);
    }

    #[sqlx::test]
    async fn test_strategies_store_identical_rows(pool: PgPool) -> sqlx::Result<()> {
        let input = lumis(37);
        let expected: BTreeSet<_> = input
            .iter()
            .map(|l| (l.run_num, l.lumi_section_num, l.event_count))
            .collect();

        let inserters: Vec<(i64, Box<dyn LumiInserter>)> = vec![
            (101, Box::new(SequentialLumiInserter::new(statements()))),
            (102, Box::new(ChunkedLumiInserter::new(statements(), 8))),
            (103, Box::new(StagingLumiInserter::new(statements()))),
        ];

        seed_file(&pool, 101).await?;
        for file_id in [102i64, 103] {
            sqlx::query(
                "INSERT INTO files (file_id, logical_file_name, dataset_id, block_id, file_type_id) \
                 VALUES ($1, $2, 1, 1, 1)",
            )
            .bind(file_id)
            .bind(format!("/store/lumi/{file_id}.root"))
            .execute(&pool)
            .await?;
        }

        for (file_id, inserter) in inserters {
            let mut tx = pool.begin().await?;
            let written = inserter.insert(&mut tx, file_id, &input).await.unwrap();
            tx.commit().await?;
            assert_eq!(written, 37, "{}", inserter.strategy());
            assert_eq!(stored(&pool, file_id).await?, expected, "{}", inserter.strategy());
        }
        Ok(())
    }

    #[sqlx::test]
    async fn test_reinsert_is_duplicate_safe(pool: PgPool) -> sqlx::Result<()> {
        seed_file(&pool, 7).await?;
        let input = lumis(25);

        for strategy in [LumiStrategy::Sequential, LumiStrategy::Chunked, LumiStrategy::Staging] {
            let selector = LumiStrategySelector::new(statements(), strategy, 0, 6);
            let mut tx = pool.begin().await?;
            selector.insert(&mut tx, 7, &input).await.unwrap();
            // a repeated run inside the same transaction exercises the cleared temp table
            let again = selector.insert(&mut tx, 7, &input).await.unwrap();
            tx.commit().await?;
            assert_eq!(again, 0, "{strategy}");
            assert_eq!(stored(&pool, 7).await?.len(), 25, "{strategy}");
        }
        Ok(())
    }

    #[sqlx::test]
    async fn test_staging_collapses_duplicates_in_input(pool: PgPool) -> sqlx::Result<()> {
        seed_file(&pool, 9).await?;
        let mut input = lumis(5);
        input.extend(lumis(5));

        let mut tx = pool.begin().await?;
        let written = StagingLumiInserter::new(statements())
            .insert(&mut tx, 9, &input)
            .await
            .unwrap();
        tx.commit().await?;

        assert_eq!(written, 5);
        Ok(())
    }
}
