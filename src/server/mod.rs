//! HTTP Server
//!
//! API endpoints:
//! - POST /docstoaudio - multipart `docs` (+ optional `language`, `tone`) → streamed MP3
//! - GET  /health      - liveness probe

pub mod stream;
pub mod upload;

use crate::config::Config;
use crate::error::PipelineError;
use crate::extract::DocumentExtractor;
use crate::openai::OpenAIClient;
use crate::pipeline::DocsToAudio;
use crate::speech::OpenAISynthesizer;
use crate::storage::TempStorage;
use crate::translate::OpenAITranslator;
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Shared, immutable per-process state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<DocsToAudio>,
    max_upload_bytes: usize,
}

/// Build the router around a ready pipeline.
pub fn router(service: DocsToAudio, max_upload_bytes: usize) -> Router {
    let state = AppState {
        service: Arc::new(service),
        max_upload_bytes,
    };

    Router::new()
        .route("/docstoaudio", post(docs_to_audio))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the OpenAI-backed collaborators from configuration.
pub async fn build_service(config: &Config) -> Result<DocsToAudio> {
    let api_key = config
        .openai
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("No OpenAI API key configured. Set OPENAI_API_KEY (or Openaikey).")?;

    let client = OpenAIClient::new(api_key, &config.openai)
        .context("Failed to create OpenAI HTTP client")?;
    let storage = TempStorage::open(&config.server.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {:?}", config.server.upload_dir))?;

    Ok(DocsToAudio::new(
        Arc::new(DocumentExtractor::new()),
        Arc::new(OpenAITranslator::new(
            client.clone(),
            config.openai.chat_model.clone(),
            config.openai.max_tokens,
        )),
        Arc::new(OpenAISynthesizer::new(
            client,
            config.openai.tts_model.clone(),
            config.pipeline.max_speech_chars,
        )),
        storage,
        config.pipeline.clone(),
    ))
}

/// Bind and serve until `shutdown` resolves.
pub async fn start(config: &Config, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let service = build_service(config).await?;
    let app = router(service, config.server.max_upload_bytes);

    let addr = parse_addr(&config.server.bind, config.server.port)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server is running on http://{}", listener.local_addr()?);
    tracing::info!("  - POST /docstoaudio  Convert a document to spoken audio");
    tracing::info!("  - GET  /health       Liveness probe");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Parse bind address and port into a SocketAddr.
fn parse_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    let host = bind.trim_start_matches('[').trim_end_matches(']');
    let addr = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    addr.parse()
        .with_context(|| format!("Invalid bind address: {}", addr))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn docs_to_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("docstoaudio", %request_id);

    async move {
        match convert(&state, multipart).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Request failed ({}): {}", e.kind(), e);
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn convert(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PipelineError> {
    let multipart = multipart
        .map_err(|e| PipelineError::upload(format!("Invalid multipart request: {}", e)))?;

    let (document, options) =
        upload::receive(multipart, state.service.storage(), state.max_upload_bytes).await?;
    let artifact = state.service.run(document, &options).await?;
    stream::respond(artifact).await
}
