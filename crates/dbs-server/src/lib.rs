//! DBS Server Library
//!
//! HTTP server for the dataset bookkeeping catalog.
//!
//! # Overview
//!
//! - **Bulk ingestion**: `POST /api/v1/bulkblocks` writes one block with its
//!   dataset, files, lumi sections, parentage, and output module configs.
//!   Reference entities are created at most once, even under concurrent
//!   submissions; the block itself commits all-or-nothing.
//! - **Read API**: blocks, files, file parents and children, file lumis.
//! - **Statements**: every SQL statement is a named template under a
//!   configurable schema owner.
//!
//! # Architecture
//!
//! Features are vertical slices with commands (writes) and queries (reads)
//! implementing `mediator::Request`. The ingestion pipeline lives in
//! [`ingest`]:
//!
//! ```text
//! validate -> resolve dependencies -> block -> files (concurrent) -> lumis -> links -> commit
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dbs_server::{config::Config, db, ingest::BulkIngestor, statements::TemplateStatements};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     let statements = Arc::new(TemplateStatements::from_config(&config.ingest)?);
//!     let ingestor = BulkIngestor::new(pool, statements, &config.ingest);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod statements;

pub use error::{AppError, AppResult};
