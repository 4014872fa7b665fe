use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::features::shared::ReadState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilesQuery {
    pub logical_file_name: Option<String>,
    pub block_name: Option<String>,
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub file_id: i64,
    pub logical_file_name: String,
    pub is_file_valid: i64,
    pub block_name: String,
    pub dataset: String,
    pub file_type: String,
    pub check_sum: Option<String>,
    pub event_count: i64,
    pub file_size: i64,
    pub adler32: Option<String>,
    pub md5: Option<String>,
    pub auto_cross_section: Option<f64>,
    pub creation_date: Option<i64>,
    pub create_by: Option<String>,
}

impl Request<AppResult<Vec<FileRecord>>> for ListFilesQuery {}

impl crate::cqrs::middleware::Query for ListFilesQuery {}

impl ListFilesQuery {
    pub fn validate(&self) -> AppResult<()> {
        let given = [&self.logical_file_name, &self.block_name, &self.dataset]
            .into_iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()));
        if !given {
            return Err(AppError::BadRequest(
                "logical_file_name, block_name or dataset is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state))]
pub async fn handle(state: ReadState, query: ListFilesQuery) -> AppResult<Vec<FileRecord>> {
    query.validate()?;

    let sql = state.statements.statement("files.list")?;
    let records = sqlx::query_as::<_, FileRecord>(&sql)
        .bind(query.logical_file_name.as_deref())
        .bind(query.block_name.as_deref())
        .bind(query.dataset.as_deref())
        .fetch_all(&state.db)
        .await?;

    Ok(records)
}
