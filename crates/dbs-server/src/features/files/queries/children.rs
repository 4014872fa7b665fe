use mediator::Request;
use serde::{Deserialize, Serialize};

use super::required_lfn;
use crate::error::AppResult;
use crate::features::shared::ReadState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChildrenQuery {
    pub logical_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileChildRecord {
    pub logical_file_name: String,
    pub child_logical_file_name: String,
    pub child_file_id: i64,
}

impl Request<AppResult<Vec<FileChildRecord>>> for FileChildrenQuery {}

impl crate::cqrs::middleware::Query for FileChildrenQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle(state: ReadState, query: FileChildrenQuery) -> AppResult<Vec<FileChildRecord>> {
    required_lfn(&query.logical_file_name)?;

    let sql = state.statements.statement("file_children.list")?;
    let records = sqlx::query_as::<_, FileChildRecord>(&sql)
        .bind(&query.logical_file_name)
        .fetch_all(&state.db)
        .await?;

    Ok(records)
}
