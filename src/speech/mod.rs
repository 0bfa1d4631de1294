//! Speech Synthesis
//!
//! Converts translated text into MPEG audio through the OpenAI speech
//! endpoint. Input longer than the configured character cap is refused up
//! front instead of being sent and truncated remotely.

use crate::error::PipelineError;
use crate::openai::{OpenAIClient, SpeechRequest};
use async_trait::async_trait;

const FAILURE_PREFIX: &str = "Text to speech conversion failed";

/// Text plus the voice it should be spoken in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Remote speech-synthesis capability. Returns encoded audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, PipelineError>;
}

/// Build the error every synthesis failure is reported as.
pub fn synthesis_failure(cause: impl std::fmt::Display) -> PipelineError {
    PipelineError::synthesis(format!("{}: {}", FAILURE_PREFIX, cause))
}

/// Synthesizer backed by the OpenAI `audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAISynthesizer {
    client: OpenAIClient,
    model: String,
    max_chars: usize,
}

impl OpenAISynthesizer {
    pub fn new(client: OpenAIClient, model: impl Into<String>, max_chars: usize) -> Self {
        Self {
            client,
            model: model.into(),
            max_chars,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, PipelineError> {
        let chars = request.text.chars().count();
        if chars > self.max_chars {
            return Err(synthesis_failure(format!(
                "input is {} characters, limit is {}",
                chars, self.max_chars
            )));
        }

        let speech = SpeechRequest {
            model: self.model.clone(),
            input: request.text.clone(),
            voice: request.voice.clone(),
            response_format: Some("mp3".to_string()),
        };

        let audio = self
            .client
            .create_speech(&speech)
            .await
            .map_err(synthesis_failure)?;

        if audio.is_empty() {
            return Err(synthesis_failure("service returned no audio"));
        }
        Ok(audio)
    }
}
