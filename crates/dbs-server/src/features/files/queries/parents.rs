use mediator::Request;
use serde::{Deserialize, Serialize};

use super::required_lfn;
use crate::error::AppResult;
use crate::features::shared::ReadState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileParentsQuery {
    pub logical_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileParentRecord {
    pub logical_file_name: String,
    pub parent_logical_file_name: String,
    pub parent_file_id: i64,
}

impl Request<AppResult<Vec<FileParentRecord>>> for FileParentsQuery {}

impl crate::cqrs::middleware::Query for FileParentsQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle(state: ReadState, query: FileParentsQuery) -> AppResult<Vec<FileParentRecord>> {
    required_lfn(&query.logical_file_name)?;

    let sql = state.statements.statement("file_parents.list")?;
    let records = sqlx::query_as::<_, FileParentRecord>(&sql)
        .bind(&query.logical_file_name)
        .fetch_all(&state.db)
        .await?;

    Ok(records)
}
