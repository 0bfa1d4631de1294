//! Configuration Types
//!
//! Serde structures for `docstoaudio.toml`. Every field has a default so a
//! partial file (or no file at all) still yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI-compatible provider configuration
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Pipeline defaults and limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory for uploaded documents and generated audio (default: "uploads")
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Maximum accepted request body in bytes (default: 25 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key (loaded from OPENAI_API_KEY / Openaikey, never written back)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (default: "https://api.openai.com/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model used for translation (default: "gpt-4")
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Speech model (default: "tts-1")
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Generated-token budget for one translation (default: 1000)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Total request timeout in seconds (default: 120)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            tts_model: default_tts_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Pipeline defaults and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target language when the form omits `language` (default: "en")
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Voice when the form omits `tone` (default: "nova")
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Longest text (in characters) sent to speech synthesis (default: 4096)
    #[serde(default = "default_max_speech_chars")]
    pub max_speech_chars: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_voice() -> String {
    "nova".to_string()
}

fn default_max_speech_chars() -> usize {
    4096
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            default_voice: default_voice(),
            max_speech_chars: default_max_speech_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
