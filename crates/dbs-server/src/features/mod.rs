//! Feature modules implementing the catalog API
//!
//! Each feature is a vertical slice with its own commands or queries and
//! routes:
//!
//! - **bulkblocks**: bulk block ingestion (`POST /bulkblocks`)
//! - **blocks**: block listing
//! - **files**: files, their parents, children, and lumi sections
//!
//! Commands and queries implement `mediator::Request` and are registered in
//! [`crate::cqrs::build_mediator`].

pub mod blocks;
pub mod bulkblocks;
pub mod files;
pub mod shared;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::ingest::BulkIngestor;
use crate::statements::StatementProvider;
use shared::ReadState;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for read queries and health checks
    pub db: PgPool,
    /// Named SQL statements under the configured schema owner
    pub statements: Arc<dyn StatementProvider>,
    /// Bulk block ingestion pipeline
    pub ingestor: Arc<BulkIngestor>,
}

impl FeatureState {
    pub fn read_state(&self) -> ReadState {
        ReadState {
            db: self.db.clone(),
            statements: self.statements.clone(),
        }
    }
}

/// Creates the API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/bulkblocks", bulkblocks::bulkblocks_routes().with_state(state.ingestor.clone()))
        .nest("/blocks", blocks::blocks_routes().with_state(state.read_state()))
        .merge(files::files_routes().with_state(state.read_state()))
}
