//! Streaming responder.
//!
//! The response body pulls the audio file in chunks as the connection drains,
//! so a slow client never forces the whole file into memory. The body owns the
//! request's temp files; they are deleted when the stream finishes, fails, or
//! is dropped because the client went away.

use crate::error::PipelineError;
use crate::pipeline::{AudioArtifact, PipelineStage};
use axum::body::{Body, Bytes};
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Build the `200 audio/mpeg` response for `artifact`. The file is opened
/// before headers are produced, so an open failure can still become a 500.
pub async fn respond(artifact: AudioArtifact) -> Result<Response, PipelineError> {
    let opened = match File::open(artifact.path()).await {
        Ok(file) => file.metadata().await.map(|meta| (file, meta.len())),
        Err(e) => Err(e),
    };
    let (file, len) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!("Error streaming audio: {}", e);
            artifact.remove().await;
            return Err(PipelineError::stream(e.to_string()));
        }
    };

    tracing::debug!("Pipeline {}: {} bytes", PipelineStage::Streaming, len);
    let body = Body::from_stream(AudioStream::new(file, len, artifact));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::CONTENT_LENGTH, len)
        .body(body)
        .map_err(|e| PipelineError::stream(e.to_string()))
}

/// File-backed byte stream that owns the request's temp files.
pub struct AudioStream {
    inner: ReaderStream<File>,
    artifact: Option<AudioArtifact>,
    expected: u64,
    sent: u64,
}

impl AudioStream {
    pub fn new(file: File, expected: u64, artifact: AudioArtifact) -> Self {
        Self {
            inner: ReaderStream::new(file),
            artifact: Some(artifact),
            expected,
            sent: 0,
        }
    }

    /// Record how the stream ended and hand back the temp files, once.
    fn finish(&mut self, stage: PipelineStage) -> Option<AudioArtifact> {
        let artifact = self.artifact.take()?;
        match stage {
            PipelineStage::Completed => {
                tracing::info!("Audio stream {}: {} bytes sent", stage, self.sent)
            }
            _ => tracing::warn!(
                "Audio stream {} after {} of {} bytes",
                stage,
                self.sent,
                self.expected
            ),
        }
        Some(artifact)
    }

    /// Delete the temp files off the polling thread.
    fn release(&mut self, stage: PipelineStage) {
        if let Some(artifact) = self.finish(stage) {
            tokio::spawn(artifact.remove());
        }
    }
}

impl Stream for AudioStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::error!("Error streaming audio: {}", e);
                this.release(PipelineStage::Failed);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.release(PipelineStage::Completed);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        // hyper may stop polling once Content-Length bytes are out.
        let stage = if self.sent >= self.expected {
            PipelineStage::Completed
        } else {
            PipelineStage::Failed
        };
        // Dropping the guards deletes the files synchronously.
        drop(self.finish(stage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{TempFile, TempStorage};
    use futures::StreamExt;
    use tempfile::TempDir;

    async fn artifact(storage: &TempStorage, audio: &[u8]) -> AudioArtifact {
        let upload_path = storage.upload_path(Some("doc.docx"));
        std::fs::write(&upload_path, b"doc").unwrap();
        AudioArtifact {
            audio: storage.write_audio(audio).await.unwrap(),
            upload: TempFile::new(upload_path),
        }
    }

    fn files_in(storage: &TempStorage) -> usize {
        std::fs::read_dir(storage.dir()).unwrap().count()
    }

    /// File count once the background removal task has had a chance to run.
    async fn settled_files(storage: &TempStorage) -> usize {
        for _ in 0..50 {
            if files_in(storage) == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        files_in(storage)
    }

    #[tokio::test]
    async fn test_respond_sets_audio_headers_and_streams_body() {
        let dir = TempDir::new().unwrap();
        let storage = TempStorage::open(dir.path()).await.unwrap();
        let audio = vec![7u8; 200_000];

        let response = respond(artifact(&storage, &audio).await).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "inline");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "200000");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), audio.len());
        assert_eq!(settled_files(&storage).await, 0);
    }

    #[tokio::test]
    async fn test_stream_deletes_files_at_end() {
        let dir = TempDir::new().unwrap();
        let storage = TempStorage::open(dir.path()).await.unwrap();
        let artifact = artifact(&storage, b"abc").await;
        let file = File::open(artifact.path()).await.unwrap();

        let mut stream = AudioStream::new(file, 3, artifact);
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(collected, b"abc");
        assert_eq!(settled_files(&storage).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_stream_deletes_files() {
        let dir = TempDir::new().unwrap();
        let storage = TempStorage::open(dir.path()).await.unwrap();
        let artifact = artifact(&storage, &[1u8; 64]).await;
        let file = File::open(artifact.path()).await.unwrap();

        let stream = AudioStream::new(file, 64, artifact);
        assert_eq!(files_in(&storage), 2);
        drop(stream);
        assert_eq!(files_in(&storage), 0);
    }

    #[tokio::test]
    async fn test_respond_missing_audio_is_stream_error() {
        let dir = TempDir::new().unwrap();
        let storage = TempStorage::open(dir.path()).await.unwrap();
        let artifact = artifact(&storage, b"abc").await;
        std::fs::remove_file(artifact.path()).unwrap();

        let err = respond(artifact).await.unwrap_err();
        assert!(matches!(err, PipelineError::Stream(_)));
        assert_eq!(err.client_message(), "Error streaming audio.");
        assert_eq!(files_in(&storage), 0);
    }
}
