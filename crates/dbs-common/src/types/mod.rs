//! Shared domain types

pub mod bulkblock;
mod validation;

pub use bulkblock::{
    AcquisitionEra, Block, BulkBlock, Dataset, DatasetConfig, File, FileConfig, FileLumi,
    FileParent, FileParentLink, PrimaryDataset, ProcessingEra,
};
pub use validation::BulkBlockParts;
