//! Ingestion error taxonomy
//!
//! Every variant records the dotted name of the step that failed so the
//! outbound error object can point at it.

use dbs_common::ValidationError;
use thiserror::Error;

use crate::statements::StatementError;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{function}: {source}")]
    Validation {
        function: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("{function}: unable to decode bulk block: {source}")]
    Unmarshal {
        function: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{function}: transaction error: {source}")]
    Transaction {
        function: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{function}: failed to look up {entity} '{key}': {source}")]
    GetId {
        function: &'static str,
        entity: &'static str,
        key: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{function}: unable to find id for {entity} '{key}'")]
    MissingId {
        function: &'static str,
        entity: &'static str,
        key: String,
    },

    #[error("{function}: failed to insert {entity} '{key}': {source}")]
    Insert {
        function: &'static str,
        entity: &'static str,
        key: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{function}: {entity} '{key}' {detail}")]
    Conflict {
        function: &'static str,
        entity: &'static str,
        key: String,
        detail: String,
    },

    #[error("{function}: {failed} of {total} file units failed, first error: {first_error}")]
    Concurrency {
        function: &'static str,
        failed: usize,
        total: usize,
        first_error: String,
    },

    #[error("{function}: submission cancelled before completion")]
    Cancelled { function: &'static str },

    #[error("{function}: {source}")]
    Statement {
        function: &'static str,
        #[source]
        source: StatementError,
    },
}

/// Coarse classification used for status codes and error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unmarshal,
    Transaction,
    GetId,
    Insert,
    Conflict,
    Concurrency,
    Cancelled,
    Statement,
}

impl ErrorKind {
    /// Numeric code reported to clients.
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::Transaction => 102,
            ErrorKind::Statement => 108,
            ErrorKind::GetId => 109,
            ErrorKind::Insert => 110,
            ErrorKind::Validation => 113,
            ErrorKind::Unmarshal => 122,
            ErrorKind::Conflict => 128,
            ErrorKind::Concurrency => 142,
            ErrorKind::Cancelled => 143,
        }
    }

    /// Short human-readable reason.
    pub fn reason(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Unmarshal => "unable to decode request body",
            ErrorKind::Transaction => "transaction error",
            ErrorKind::GetId => "unable to find id",
            ErrorKind::Insert => "insert error",
            ErrorKind::Conflict => "conflicting record",
            ErrorKind::Concurrency => "concurrent insert error",
            ErrorKind::Cancelled => "submission cancelled",
            ErrorKind::Statement => "statement error",
        }
    }
}

impl IngestError {
    pub fn validation(function: &'static str, source: ValidationError) -> Self {
        Self::Validation { function, source }
    }

    pub fn unmarshal(function: &'static str, source: serde_json::Error) -> Self {
        Self::Unmarshal { function, source }
    }

    pub fn transaction(function: &'static str, source: sqlx::Error) -> Self {
        Self::Transaction { function, source }
    }

    pub fn statement(function: &'static str, source: StatementError) -> Self {
        Self::Statement { function, source }
    }

    pub fn missing_id(function: &'static str, entity: &'static str, key: impl Into<String>) -> Self {
        Self::MissingId {
            function,
            entity,
            key: key.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Validation { .. } => ErrorKind::Validation,
            IngestError::Unmarshal { .. } => ErrorKind::Unmarshal,
            IngestError::Transaction { .. } => ErrorKind::Transaction,
            IngestError::GetId { .. } | IngestError::MissingId { .. } => ErrorKind::GetId,
            IngestError::Insert { .. } => ErrorKind::Insert,
            IngestError::Conflict { .. } => ErrorKind::Conflict,
            IngestError::Concurrency { .. } => ErrorKind::Concurrency,
            IngestError::Cancelled { .. } => ErrorKind::Cancelled,
            IngestError::Statement { .. } => ErrorKind::Statement,
        }
    }

    /// Dotted name of the failing step, e.g. `ingest.files.insert_file`.
    pub fn function(&self) -> &'static str {
        match self {
            IngestError::Validation { function, .. }
            | IngestError::Unmarshal { function, .. }
            | IngestError::Transaction { function, .. }
            | IngestError::GetId { function, .. }
            | IngestError::MissingId { function, .. }
            | IngestError::Insert { function, .. }
            | IngestError::Conflict { function, .. }
            | IngestError::Concurrency { function, .. }
            | IngestError::Cancelled { function }
            | IngestError::Statement { function, .. } => *function,
        }
    }

    pub fn code(&self) -> u16 {
        self.kind().code()
    }

    pub fn reason(&self) -> &'static str {
        self.kind().reason()
    }

    /// True when the client sent something the catalog cannot accept as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::Validation { .. }
                | IngestError::Unmarshal { .. }
                | IngestError::MissingId { .. }
                | IngestError::Conflict { .. }
        )
    }
}
