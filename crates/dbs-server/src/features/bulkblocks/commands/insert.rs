use dbs_common::types::BulkBlock;
use mediator::Request;
use std::sync::Arc;

use crate::ingest::{BulkIngestor, IngestError, IngestReport};

/// Ingest one bulk block on behalf of `submitter`.
#[derive(Debug, Clone)]
pub struct InsertBulkBlockCommand {
    pub submission: BulkBlock,
    pub submitter: Option<String>,
}

impl Request<Result<IngestReport, IngestError>> for InsertBulkBlockCommand {}

impl crate::cqrs::middleware::Command for InsertBulkBlockCommand {}

#[tracing::instrument(skip(ingestor, command), fields(submitter = ?command.submitter))]
pub async fn handle(
    ingestor: Arc<BulkIngestor>,
    command: InsertBulkBlockCommand,
) -> Result<IngestReport, IngestError> {
    let report = ingestor
        .insert_bulk_block(command.submission, command.submitter.as_deref())
        .await?;

    tracing::info!(
        block_id = report.block_id,
        block = %report.block_name,
        created = report.block_created,
        files_inserted = report.files_inserted,
        files_reused = report.files_reused,
        lumis = report.lumis_written,
        "Bulk block committed"
    );

    Ok(report)
}
