pub use mediator::DefaultAsyncMediator;
use std::sync::Arc;

use crate::features::shared::ReadState;
use crate::ingest::BulkIngestor;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(ingestor: Arc<BulkIngestor>, read: ReadState) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Bulk blocks
        .add_handler({
            let ingestor = ingestor.clone();
            move |cmd| {
                let ingestor = ingestor.clone();
                async move { crate::features::bulkblocks::commands::insert::handle(ingestor, cmd).await }
            }
        })
        // Blocks
        .add_handler({
            let read = read.clone();
            move |query| {
                let read = read.clone();
                async move { crate::features::blocks::queries::list::handle(read, query).await }
            }
        })
        // Files
        .add_handler({
            let read = read.clone();
            move |query| {
                let read = read.clone();
                async move { crate::features::files::queries::list::handle(read, query).await }
            }
        })
        .add_handler({
            let read = read.clone();
            move |query| {
                let read = read.clone();
                async move { crate::features::files::queries::parents::handle(read, query).await }
            }
        })
        .add_handler({
            let read = read.clone();
            move |query| {
                let read = read.clone();
                async move { crate::features::files::queries::children::handle(read, query).await }
            }
        })
        .add_handler({
            let read = read.clone();
            move |query| {
                let read = read.clone();
                async move { crate::features::files::queries::lumis::handle(read, query).await }
            }
        })
        .build()
}
