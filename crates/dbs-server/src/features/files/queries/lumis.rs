use mediator::Request;
use serde::{Deserialize, Serialize};

use super::required_lfn;
use crate::error::AppResult;
use crate::features::shared::ReadState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLumisQuery {
    pub logical_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileLumiRecord {
    pub logical_file_name: String,
    pub run_num: i64,
    pub lumi_section_num: i64,
    pub event_count: Option<i64>,
}

impl Request<AppResult<Vec<FileLumiRecord>>> for FileLumisQuery {}

impl crate::cqrs::middleware::Query for FileLumisQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle(state: ReadState, query: FileLumisQuery) -> AppResult<Vec<FileLumiRecord>> {
    required_lfn(&query.logical_file_name)?;

    let sql = state.statements.statement("file_lumis.list")?;
    let records = sqlx::query_as::<_, FileLumiRecord>(&sql)
        .bind(&query.logical_file_name)
        .fetch_all(&state.db)
        .await?;

    Ok(records)
}
