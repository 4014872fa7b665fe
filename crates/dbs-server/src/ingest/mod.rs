//! Bulk block ingestion pipeline
//!
//! Takes one validated bulk block submission and writes it to the catalog:
//! reference entities first, each in its own short transaction, then the
//! block, files, lumis, and links in a single block transaction.

pub mod config;
pub mod error;
pub mod files;
pub mod ids;
pub mod linkage;
pub mod lumis;
pub mod orchestrator;
pub mod records;
pub mod resolver;
pub mod tables;
pub mod transaction;

pub use config::IngestConfig;
pub use error::{ErrorKind, IngestError, IngestResult};
pub use ids::{IdAllocator, IdStrategy};
pub use lumis::{LumiInserter, LumiStrategy, LumiStrategySelector};
pub use orchestrator::{BulkIngestor, IngestReport, IngestState};
pub use resolver::Resolver;
