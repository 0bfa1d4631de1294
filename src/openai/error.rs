//! Provider error types

use thiserror::Error;

/// Longest slice of a non-JSON error body kept in messages.
const MAX_BODY_PREVIEW: usize = 200;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Body preview for error messages, cut on a UTF-8 boundary.
pub(crate) fn body_preview(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= MAX_BODY_PREVIEW {
        return body;
    }
    let mut end = MAX_BODY_PREVIEW;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_status() {
        let err = ProviderError::ApiError {
            status: 401,
            message: "Incorrect API key provided".to_string(),
            error_type: Some("invalid_request_error".to_string()),
        };
        assert_eq!(err.to_string(), "API error (401): Incorrect API key provided");
    }

    #[test]
    fn test_rate_limit_display() {
        let err = ProviderError::RateLimitExceeded("slow down".into());
        assert_eq!(err.to_string(), "Rate limit exceeded: slow down");
    }

    #[test]
    fn test_body_preview_short_body_untouched() {
        assert_eq!(body_preview("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_body_preview_cuts_on_char_boundary() {
        // 'é' is two bytes, so byte 200 falls inside a character.
        let body = format!("a{}", "é".repeat(150));
        let preview = body_preview(&body);
        assert!(preview.len() <= MAX_BODY_PREVIEW);
        assert_eq!(preview.len(), 199);
        assert!(body.starts_with(preview));
    }
}
