//! Block API routes
//!
//! - `GET /api/v1/blocks?block_name=` - A block by name
//! - `GET /api/v1/blocks?dataset=` - All blocks of a dataset

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::queries::{BlockRecord, ListBlocksQuery};
use crate::error::AppResult;
use crate::features::shared::ReadState;

pub fn blocks_routes() -> Router<ReadState> {
    Router::new().route("/", get(list_blocks))
}

#[tracing::instrument(skip(state))]
async fn list_blocks(
    State(state): State<ReadState>,
    Query(query): Query<ListBlocksQuery>,
) -> AppResult<Json<Vec<BlockRecord>>> {
    let records = super::queries::list::handle(state, query).await?;
    Ok(Json(records))
}
