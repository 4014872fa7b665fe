//! File API routes
//!
//! - `GET /api/v1/files?logical_file_name=|block_name=|dataset=`
//! - `GET /api/v1/fileparents?logical_file_name=`
//! - `GET /api/v1/filechildren?logical_file_name=`
//! - `GET /api/v1/filelumis?logical_file_name=`

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::queries::{
    FileChildRecord, FileChildrenQuery, FileLumiRecord, FileLumisQuery, FileParentRecord,
    FileParentsQuery, FileRecord, ListFilesQuery,
};
use crate::error::AppResult;
use crate::features::shared::ReadState;

pub fn files_routes() -> Router<ReadState> {
    Router::new()
        .route("/files", get(list_files))
        .route("/fileparents", get(list_file_parents))
        .route("/filechildren", get(list_file_children))
        .route("/filelumis", get(list_file_lumis))
}

#[tracing::instrument(skip(state))]
async fn list_files(
    State(state): State<ReadState>,
    Query(query): Query<ListFilesQuery>,
) -> AppResult<Json<Vec<FileRecord>>> {
    Ok(Json(super::queries::list::handle(state, query).await?))
}

#[tracing::instrument(skip(state))]
async fn list_file_parents(
    State(state): State<ReadState>,
    Query(query): Query<FileParentsQuery>,
) -> AppResult<Json<Vec<FileParentRecord>>> {
    Ok(Json(super::queries::parents::handle(state, query).await?))
}

#[tracing::instrument(skip(state))]
async fn list_file_children(
    State(state): State<ReadState>,
    Query(query): Query<FileChildrenQuery>,
) -> AppResult<Json<Vec<FileChildRecord>>> {
    Ok(Json(super::queries::children::handle(state, query).await?))
}

#[tracing::instrument(skip(state))]
async fn list_file_lumis(
    State(state): State<ReadState>,
    Query(query): Query<FileLumisQuery>,
) -> AppResult<Json<Vec<FileLumiRecord>>> {
    Ok(Json(super::queries::lumis::handle(state, query).await?))
}
