//! Test helpers for dbs-server integration tests
//!
//! - Application wiring over a `#[sqlx::test]` pool
//! - Request helpers for `oneshot` calls
//! - Bulk block fixtures

#![allow(dead_code)]

pub mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dbs_server::config::Config;
use dbs_server::features::FeatureState;
use dbs_server::ingest::{BulkIngestor, IngestConfig};
use dbs_server::statements::{StatementProvider, TemplateStatements};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;

pub use fixtures::*;

/// Router and ingestor sharing one test database.
pub struct TestApp {
    pub pool: PgPool,
    pub ingestor: Arc<BulkIngestor>,
    pub router: Router,
}

impl TestApp {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, IngestConfig::default())
    }

    pub fn with_config(pool: PgPool, ingest: IngestConfig) -> Self {
        let statements: Arc<dyn StatementProvider> = Arc::new(TemplateStatements::builtin(""));
        let ingestor = Arc::new(BulkIngestor::new(pool.clone(), statements.clone(), &ingest));
        let state = FeatureState {
            db: pool.clone(),
            statements,
            ingestor: ingestor.clone(),
        };
        let router = dbs_server::api::create_router(state, &Config::default().cors);
        Self {
            pool,
            ingestor,
            router,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>, user: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        self.send(builder.body(body.into()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: &impl serde::Serialize, user: Option<&str>) -> (StatusCode, serde_json::Value) {
        self.post_raw(uri, serde_json::to_vec(body).unwrap(), user).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

/// Row count of `table`.
pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Counts of every table a block transaction writes.
pub async fn block_scoped_counts(pool: &PgPool) -> [i64; 4] {
    [
        count(pool, "blocks").await,
        count(pool, "files").await,
        count(pool, "file_lumis").await,
        count(pool, "file_parents").await,
    ]
}
