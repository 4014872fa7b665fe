//! Shared utilities and types for feature modules
//!
//! - **error_helpers**: Database error classification

pub mod error_helpers;

use sqlx::PgPool;
use std::sync::Arc;

use crate::statements::StatementProvider;

/// State for the read endpoints
#[derive(Clone)]
pub struct ReadState {
    pub db: PgPool,
    pub statements: Arc<dyn StatementProvider>,
}
