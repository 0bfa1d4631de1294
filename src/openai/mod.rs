//! OpenAI Client
//!
//! Minimal client for the two OpenAI endpoints the pipeline consumes:
//! chat completions (translation) and audio speech (synthesis). Any
//! OpenAI-compatible server works via `base_url`.

mod error;
mod types;

pub use error::{ProviderError, Result};
pub use types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseMessage,
    SpeechRequest, Usage,
};

use crate::config::OpenAIConfig;
use error::body_preview;
use reqwest::Client;
use std::time::Duration;
use types::ApiErrorBody;

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP client for the OpenAI API. Cheap to clone; clones share a pool.
#[derive(Clone)]
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a client with the configured timeouts. The key is passed in
    /// explicitly; nothing here reads the environment.
    pub fn new(api_key: impl Into<String>, settings: &OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self::with_client(api_key, settings.base_url.clone(), client))
    }

    /// Create with custom HTTP client
    pub fn with_client(api_key: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `POST /chat/completions`
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse chat completion: {}", e))
        })?;

        if let Some(usage) = parsed.usage {
            tracing::debug!(
                "OpenAI chat: {} prompt + {} completion tokens",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(parsed)
    }

    /// `POST /audio/speech`, returning the raw audio bytes.
    pub async fn create_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let audio_bytes = response.bytes().await?.to_vec();

        tracing::info!(
            "OpenAI TTS: generated {} bytes of audio (voice={}, model={})",
            audio_bytes.len(),
            request.voice,
            request.model,
        );

        Ok(audio_bytes)
    }

    /// Turn a non-2xx response into a `ProviderError`.
    async fn handle_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response.text().await.unwrap_or_default();
        let (message, error_type) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => (parsed.error.message, parsed.error.error_type),
            Err(_) if body.trim().is_empty() => ("Unknown error".to_string(), None),
            Err(_) => (body_preview(&body).to_string(), None),
        };

        if status == 429 {
            let message = match retry_after {
                Some(secs) => format!("{} (retry after {} seconds)", message, secs),
                None => message,
            };
            return ProviderError::RateLimitExceeded(message);
        }

        ProviderError::ApiError {
            status,
            message,
            error_type,
        }
    }
}
