use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::features::shared::ReadState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBlocksQuery {
    pub block_name: Option<String>,
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlockRecord {
    pub block_id: i64,
    pub block_name: String,
    pub dataset: String,
    pub open_for_writing: i64,
    pub origin_site_name: String,
    pub block_size: i64,
    pub file_count: i64,
    pub creation_date: Option<i64>,
    pub create_by: Option<String>,
}

impl Request<AppResult<Vec<BlockRecord>>> for ListBlocksQuery {}

impl crate::cqrs::middleware::Query for ListBlocksQuery {}

impl ListBlocksQuery {
    pub fn validate(&self) -> AppResult<()> {
        let given = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !given(&self.block_name) && !given(&self.dataset) {
            return Err(AppError::BadRequest(
                "block_name or dataset is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state))]
pub async fn handle(state: ReadState, query: ListBlocksQuery) -> AppResult<Vec<BlockRecord>> {
    query.validate()?;

    let sql = state.statements.statement("blocks.list")?;
    let records = sqlx::query_as::<_, BlockRecord>(&sql)
        .bind(query.block_name.as_deref())
        .bind(query.dataset.as_deref())
        .fetch_all(&state.db)
        .await?;

    Ok(records)
}
