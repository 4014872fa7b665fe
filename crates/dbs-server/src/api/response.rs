//! API response types
//!
//! Failures share one body shape:
//!
//! ```json
//! {"success": false, "error": {"reason": "...", "code": 113, "message": "...", "function": "..."}}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ingest::IngestError;

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub reason: String,
    pub code: u16,
    pub message: String,
    pub function: String,
}

impl ErrorResponse {
    pub fn new(
        reason: impl Into<String>,
        code: u16,
        message: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                reason: reason.into(),
                code,
                message: message.into(),
                function: function.into(),
            },
        }
    }

    /// Attach a status code and render.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl From<&IngestError> for ErrorResponse {
    fn from(err: &IngestError) -> Self {
        Self::new(err.reason(), err.code(), err.to_string(), err.function())
    }
}

/// HTTP status for an ingestion failure.
pub fn ingest_status(err: &IngestError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, IngestError::Cancelled { .. }) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbs_common::ValidationError;

    #[test]
    fn test_error_body_shape() {
        let err = IngestError::validation(
            "ingest.orchestrator.validate",
            ValidationError::MissingField("block"),
        );
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], 113);
        assert_eq!(body["error"]["reason"], "validation error");
        assert_eq!(body["error"]["function"], "ingest.orchestrator.validate");
        assert!(body["error"]["message"].as_str().unwrap().contains("block"));
    }

    #[test]
    fn test_status_mapping() {
        let missing = IngestError::missing_id("ingest.linkage.file_parents", "file", "/store/p.root");
        assert_eq!(ingest_status(&missing), StatusCode::BAD_REQUEST);

        let cancelled = IngestError::Cancelled {
            function: "ingest.files.insert_files",
        };
        assert_eq!(ingest_status(&cancelled), StatusCode::SERVICE_UNAVAILABLE);

        let failed = IngestError::Concurrency {
            function: "ingest.files.insert_files",
            failed: 1,
            total: 4,
            first_error: "boom".into(),
        };
        assert_eq!(ingest_status(&failed), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
