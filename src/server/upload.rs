//! Multipart upload receiver.

use crate::error::PipelineError;
use crate::pipeline::{ConversionOptions, UploadedDocument};
use crate::storage::{TempFile, TempStorage};
use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;

pub const DOCS_FIELD: &str = "docs";
pub const LANGUAGE_FIELD: &str = "language";
pub const TONE_FIELD: &str = "tone";

pub const MISSING_FILE_MESSAGE: &str = "No file uploaded: expected multipart field 'docs'";

/// Map a multipart read failure to an upload error. Bodies cut off by the
/// size limit get a message naming the limit instead of a parse error.
fn multipart_failure(context: &str, err: MultipartError, max_upload_bytes: usize) -> PipelineError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return PipelineError::upload(format!(
            "Upload too large: request body exceeds the {} byte limit",
            max_upload_bytes
        ));
    }
    PipelineError::upload(format!("{}: {}", context, err.body_text()))
}

/// Store the `docs` file and collect the optional form fields. Anything
/// written to disk is removed again if a later part of the body fails.
pub async fn receive(
    mut multipart: Multipart,
    storage: &TempStorage,
    max_upload_bytes: usize,
) -> Result<(UploadedDocument, ConversionOptions), PipelineError> {
    let mut document: Option<UploadedDocument> = None;
    let mut options = ConversionOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_failure("Invalid multipart body", e, max_upload_bytes))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            DOCS_FIELD => {
                if document.is_some() {
                    return Err(PipelineError::upload(
                        "Only one file may be uploaded in field 'docs'",
                    ));
                }
                document = Some(store_file(field, storage, max_upload_bytes).await?);
            }
            LANGUAGE_FIELD => options.language = Some(read_text(field, max_upload_bytes).await?),
            TONE_FIELD => options.tone = Some(read_text(field, max_upload_bytes).await?),
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let document = document.ok_or_else(|| PipelineError::upload(MISSING_FILE_MESSAGE))?;
    tracing::info!(
        "Received upload {:?} ({} bytes)",
        document.original_name.as_deref().unwrap_or("<unnamed>"),
        document.size
    );
    Ok((document, options))
}

async fn read_text(field: Field<'_>, max_upload_bytes: usize) -> Result<String, PipelineError> {
    let context = format!("Invalid '{}' field", field.name().unwrap_or_default());
    field
        .text()
        .await
        .map_err(|e| multipart_failure(&context, e, max_upload_bytes))
}

/// Stream one file field to a fresh temp path, chunk by chunk.
async fn store_file(
    mut field: Field<'_>,
    storage: &TempStorage,
    max_upload_bytes: usize,
) -> Result<UploadedDocument, PipelineError> {
    let original_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let file = TempFile::new(storage.upload_path(original_name.as_deref()));

    let mut out = tokio::fs::File::create(file.path())
        .await
        .map_err(|e| PipelineError::upload(format!("Failed to store upload: {}", e)))?;

    let mut size = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_failure("Failed to read upload", e, max_upload_bytes))?
    {
        size += chunk.len() as u64;
        out.write_all(&chunk)
            .await
            .map_err(|e| PipelineError::upload(format!("Failed to store upload: {}", e)))?;
    }
    out.flush()
        .await
        .map_err(|e| PipelineError::upload(format!("Failed to store upload: {}", e)))?;

    Ok(UploadedDocument {
        file,
        original_name,
        content_type,
        size,
    })
}
