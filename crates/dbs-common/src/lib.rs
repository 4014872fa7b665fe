//! DBS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, validation, and logging for the DBS catalog.
//!
//! # Overview
//!
//! - **Types**: the bulk block submission model accepted by the server
//! - **Validation**: structural checks run before anything touches the database
//! - **Logging**: centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use dbs_common::types::BulkBlock;
//!
//! fn check(block: &BulkBlock) -> Result<(), dbs_common::ValidationError> {
//!     let parts = block.validate()?;
//!     println!("{} files for {}", block.files.len(), parts.block.block_name);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::ValidationError;
