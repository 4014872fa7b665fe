//! Bulk block API routes
//!
//! - `POST /api/v1/bulkblocks` - Ingest one block with its dataset, files,
//!   lumis, and parentage. Responds `200 []` on commit.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::commands::InsertBulkBlockCommand;
use crate::api::response::{ingest_status, ErrorResponse};
use crate::ingest::{BulkIngestor, IngestError};

const DECODE: &str = "api.bulkblocks.decode";

/// Header carrying the authenticated submitter.
pub const USER_HEADER: &str = "x-user-id";

pub fn bulkblocks_routes() -> Router<Arc<BulkIngestor>> {
    Router::new().route("/", post(insert_bulk_block))
}

/// The body is decoded here rather than with the `Json` extractor so that a
/// malformed document is reported with the shared error body.
#[tracing::instrument(skip(ingestor, headers, body), fields(bytes = body.len()))]
async fn insert_bulk_block(
    State(ingestor): State<Arc<BulkIngestor>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BulkBlockApiError> {
    let submission = serde_json::from_slice(&body).map_err(|e| IngestError::unmarshal(DECODE, e))?;
    let submitter = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    super::commands::insert::handle(
        ingestor,
        InsertBulkBlockCommand {
            submission,
            submitter,
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(json!([]))).into_response())
}

#[derive(Debug)]
struct BulkBlockApiError(IngestError);

impl From<IngestError> for BulkBlockApiError {
    fn from(err: IngestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BulkBlockApiError {
    fn into_response(self) -> Response {
        let status = ingest_status(&self.0);
        if status.is_server_error() {
            tracing::error!(function = self.0.function(), "Bulk block ingestion failed: {}", self.0);
        } else {
            tracing::warn!(function = self.0.function(), "Bulk block rejected: {}", self.0);
        }
        ErrorResponse::from(&self.0).with_status(status)
    }
}
