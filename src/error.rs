//! Error Types
//!
//! One variant per pipeline stage. Every variant carries the human-readable
//! message that ends up in the `{"error": ...}` response body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Prefix the HTTP layer puts in front of stage 1-4 failures.
pub const CONVERSION_ERROR_PREFIX: &str = "Error converting DOCS to audio";

/// Message returned when the generated audio cannot be streamed.
pub const STREAM_ERROR_MESSAGE: &str = "Error streaming audio.";

/// Failure of one stage of the document-to-audio pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Missing, oversized or malformed upload
    #[error("{0}")]
    Upload(String),

    /// Unreadable or unsupported file, or no text inside
    #[error("{0}")]
    Extraction(String),

    /// Remote translation failed or came back empty
    #[error("{0}")]
    Translation(String),

    /// Remote speech synthesis failed, or the audio could not be stored
    #[error("{0}")]
    Synthesis(String),

    /// I/O failure while sending the audio to the client
    #[error("{0}")]
    Stream(String),
}

impl PipelineError {
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation(message.into())
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis(message.into())
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Stable code for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload_error",
            Self::Extraction(_) => "extraction_error",
            Self::Translation(_) => "translation_error",
            Self::Synthesis(_) => "synthesis_error",
            Self::Stream(_) => "stream_error",
        }
    }

    /// Text of the JSON `error` field sent to the client.
    pub fn client_message(&self) -> String {
        match self {
            Self::Stream(_) => STREAM_ERROR_MESSAGE.to_string(),
            other => format!("{}: {}", CONVERSION_ERROR_PREFIX, other),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.client_message() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
