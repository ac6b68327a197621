//! Error types for the PDF tools server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use pdftools_core::{ErrorKind, PdfToolError, Tool, UploadError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The request named a tool but could not be carried out as asked.
    #[error(transparent)]
    Rejected(PdfToolError),

    #[error("{tool} failed: {source}")]
    Failed {
        tool: Tool,
        #[source]
        source: PdfToolError,
    },

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Classify a dispatcher failure for the given tool.
    pub fn from_tool(tool: Tool, err: PdfToolError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ApiError::Rejected(err),
            ErrorKind::Unsupported | ErrorKind::Processing => {
                ApiError::Failed { tool, source: err }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upload(_) | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Failed { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Failed { .. } => {
                tracing::error!("{}", self);
                self.to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal error".to_string()
            }
            _ => {
                tracing::debug!("Rejected request: {}", self);
                self.to_string()
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let err = ApiError::from_tool(Tool::Delete, PdfToolError::CannotDeleteAllPages);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Cannot delete every page of the document");

        let err = ApiError::from(UploadError::MissingTool);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_processing_errors_carry_tool_context() {
        let err = ApiError::from_tool(Tool::Merge, PdfToolError::ParseError("bad xref".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "merge failed: Failed to parse PDF: bad xref");
    }

    #[test]
    fn test_unsupported_is_a_server_error() {
        let err = ApiError::from_tool(Tool::PdfToWord, PdfToolError::Unsupported(Tool::PdfToWord));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "pdf-to-word failed: pdf-to-word is not supported");
    }
}
