//! Text Extraction
//!
//! Turns a stored upload into plain text. Word documents are the primary
//! input; PDF and plain-text files are accepted as well. Format is decided
//! from magic bytes first and the file extension second.

pub mod docx;

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;

/// Message used whenever a document yields no text.
pub const NO_TEXT_MESSAGE: &str = "No text found in the DOCS file.";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Document text extraction capability.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Produce the plain text of the file at `path`. Empty text is an error.
    async fn extract(&self, path: &Path) -> Result<String, PipelineError>;
}

/// Formats the default extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detect the format of `bytes`, using `path`'s extension as a tie-breaker.
    pub fn detect(path: &Path, bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.starts_with(PDF_MAGIC) {
            return Ok(Self::Pdf);
        }
        if bytes.starts_with(ZIP_MAGIC) {
            return if docx::is_word_document(bytes) {
                Ok(Self::Docx)
            } else {
                Err(PipelineError::extraction(
                    "Unsupported document: zip archive is not a Word document",
                ))
            };
        }
        if bytes.starts_with(OLE_MAGIC) {
            return Err(PipelineError::extraction(
                "Unsupported document: legacy .doc files are not supported, save as .docx",
            ));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("docx") => Ok(Self::Docx),
            Some("pdf") => Ok(Self::Pdf),
            _ if looks_like_text(bytes) => Ok(Self::PlainText),
            _ => Err(PipelineError::extraction("Unsupported document format")),
        }
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

/// Default extractor backed by `zip`/`quick-xml` (DOCX) and `pdf-extract` (PDF).
#[derive(Debug, Default, Clone)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse `bytes` already known to be `format`. CPU-bound; call from a
    /// blocking context.
    fn parse(format: DocumentFormat, bytes: &[u8]) -> Result<String, PipelineError> {
        match format {
            DocumentFormat::Docx => docx::extract_text(bytes)
                .map_err(|e| PipelineError::extraction(format!("Failed to parse DOCX: {}", e))),
            DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| PipelineError::extraction(format!("Failed to parse PDF: {}", e))),
            DocumentFormat::PlainText => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    PipelineError::extraction(format!("File is not valid UTF-8 text: {}", e))
                })?;
                Ok(text.trim_start_matches('\u{feff}').to_string())
            }
        }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::extraction(format!("Failed to read uploaded file: {}", e))
        })?;

        let format = DocumentFormat::detect(path, &bytes)?;
        tracing::debug!("Extracting {:?} text from {:?} ({} bytes)", format, path, bytes.len());

        // pdf-extract panics on some malformed files; the release profile
        // unwinds so the panic stays inside this task.
        let text = tokio::task::spawn_blocking(move || Self::parse(format, &bytes))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    tracing::warn!("{:?} parser panicked on {:?}", format, path);
                    PipelineError::extraction(format!("Failed to parse {:?} document", format))
                } else {
                    PipelineError::extraction(format!("Extraction task failed: {}", e))
                }
            })??;

        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::extraction(NO_TEXT_MESSAGE));
        }
        Ok(text.to_string())
    }
}
