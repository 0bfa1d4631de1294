//! Translation
//!
//! Sends extracted text to a chat-completions model with a fixed translation
//! instruction. Output length is bounded by a generated-token budget, not a
//! character count.

use crate::error::PipelineError;
use crate::openai::{ChatCompletionRequest, ChatMessage, OpenAIClient};
use async_trait::async_trait;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that translates text.";

/// Message for an empty or missing translation.
pub const EMPTY_TRANSLATION_MESSAGE: &str = "Translation failed.";

/// Text plus the language it should be translated into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
        }
    }

    /// User prompt embedding the text and target language.
    pub fn prompt(&self) -> String {
        format!(
            "Translate the following text to {}:\n\n{}",
            self.target_language, self.text
        )
    }
}

/// Remote text-generation capability used for translation.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, PipelineError>;
}

/// Translator backed by the OpenAI chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAITranslator {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
}

impl OpenAITranslator {
    pub fn new(client: OpenAIClient, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }

    fn build_request(&self, request: &TranslationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(request.prompt()),
            ],
            max_tokens: Some(self.max_tokens),
            temperature: None,
        }
    }
}

#[async_trait]
impl Translator for OpenAITranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, PipelineError> {
        let response = self
            .client
            .chat_completion(&self.build_request(request))
            .await
            .map_err(|e| PipelineError::translation(format!("Translation failed: {}", e)))?;

        if response.first_finish_reason() == Some("length") {
            tracing::warn!(
                "Translation hit the {}-token budget and was truncated",
                self.max_tokens
            );
        }

        let translated = response.first_content().map(str::trim).unwrap_or_default();
        if translated.is_empty() {
            return Err(PipelineError::translation(EMPTY_TRANSLATION_MESSAGE));
        }

        tracing::info!(
            "Translated {} chars into {} chars ({})",
            request.text.chars().count(),
            translated.chars().count(),
            request.target_language
        );
        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::Client;

    fn translator_for(server: &mockito::ServerGuard) -> OpenAITranslator {
        let client = OpenAIClient::with_client("test-key", server.url(), Client::new());
        OpenAITranslator::new(client, "gpt-4", 1000)
    }

    fn completion(content: &str, finish_reason: &str) -> String {
        serde_json::json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish_reason
            }]
        })
        .to_string()
    }

    #[test]
    fn test_prompt_format() {
        let request = TranslationRequest::new("Hola", "fr");
        assert_eq!(request.prompt(), "Translate the following text to fr:\n\nHola");
    }

    #[tokio::test]
    async fn test_translate_sends_instruction_and_budget() {
        let mut server = mockito::Server::new_async().await;
        let expected = serde_json::json!({
            "model": "gpt-4",
            "max_tokens": 1000,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTION},
                {"role": "user", "content": "Translate the following text to de:\n\nGood morning"}
            ]
        });
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(expected))
            .with_status(200)
            .with_body(completion("  Guten Morgen \n", "stop"))
            .create_async()
            .await;

        let translated = translator_for(&server)
            .translate(&TranslationRequest::new("Good morning", "de"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(translated, "Guten Morgen");
    }

    #[tokio::test]
    async fn test_translate_truncated_output_is_still_returned() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("partial translation", "length"))
            .create_async()
            .await;

        let translated = translator_for(&server)
            .translate(&TranslationRequest::new("long text", "es"))
            .await
            .unwrap();
        assert_eq!(translated, "partial translation");
    }

    #[tokio::test]
    async fn test_translate_service_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body(r#"{"error": {"message": "The engine is currently overloaded"}}"#)
            .create_async()
            .await;

        let err = translator_for(&server)
            .translate(&TranslationRequest::new("text", "en"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Translation(_)));
        assert_eq!(
            err.to_string(),
            "Translation failed: API error (503): The engine is currently overloaded"
        );
    }

    #[tokio::test]
    async fn test_translate_empty_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("   ", "stop"))
            .create_async()
            .await;

        let err = translator_for(&server)
            .translate(&TranslationRequest::new("text", "en"))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::translation(EMPTY_TRANSLATION_MESSAGE));
    }

    #[tokio::test]
    async fn test_translate_no_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = translator_for(&server)
            .translate(&TranslationRequest::new("text", "en"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Translation failed"));
    }
}
