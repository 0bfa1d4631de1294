//! Document-to-Audio Pipeline
//!
//! Runs extraction, translation and synthesis strictly in order for one
//! request. Temporary files travel as [`TempFile`] guards: on failure the
//! upload is removed before the error is returned, and on success both files
//! are handed to the streaming responder inside an [`AudioArtifact`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::TextExtractor;
use crate::speech::{SpeechSynthesizer, SynthesisRequest, synthesis_failure};
use crate::storage::{TempFile, TempStorage};
use crate::translate::{TranslationRequest, Translator};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Per-request pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracted,
    Translated,
    Synthesized,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Translated => "translated",
            Self::Synthesized => "synthesized",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A stored upload awaiting processing.
#[derive(Debug)]
pub struct UploadedDocument {
    pub file: TempFile,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

impl UploadedDocument {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Optional form fields as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    pub language: Option<String>,
    pub tone: Option<String>,
}

/// Generated audio plus the upload it came from. Dropping it deletes both.
#[derive(Debug)]
pub struct AudioArtifact {
    pub audio: TempFile,
    pub upload: TempFile,
}

impl AudioArtifact {
    pub fn path(&self) -> &Path {
        self.audio.path()
    }

    /// Delete both files now instead of waiting for drop.
    pub async fn remove(self) {
        for file in [self.audio, self.upload] {
            let path = file.path().to_path_buf();
            if let Err(e) = file.remove().await {
                tracing::warn!("Failed to remove temp file {:?}: {}", path, e);
            }
        }
    }
}

/// The document-to-audio service with its three collaborators.
#[derive(Clone)]
pub struct DocsToAudio {
    extractor: Arc<dyn TextExtractor>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    storage: TempStorage,
    config: PipelineConfig,
}

impl DocsToAudio {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        storage: TempStorage,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            translator,
            synthesizer,
            storage,
            config,
        }
    }

    pub fn storage(&self) -> &TempStorage {
        &self.storage
    }

    /// Target language for a request; blank values fall back to the default.
    pub fn language_for<'a>(&'a self, options: &'a ConversionOptions) -> &'a str {
        non_blank(options.language.as_deref()).unwrap_or(&self.config.default_language)
    }

    /// Voice for a request; blank values fall back to the default.
    pub fn voice_for<'a>(&'a self, options: &'a ConversionOptions) -> &'a str {
        non_blank(options.tone.as_deref()).unwrap_or(&self.config.default_voice)
    }

    /// Run stages 2-4 for one upload. On error the upload file is already
    /// gone when this returns.
    pub async fn run(
        &self,
        upload: UploadedDocument,
        options: &ConversionOptions,
    ) -> Result<AudioArtifact, PipelineError> {
        let mut stage = PipelineStage::Received;
        tracing::debug!(
            "Pipeline {}: {:?} ({} bytes, {})",
            stage,
            upload.original_name.as_deref().unwrap_or("<unnamed>"),
            upload.size,
            upload.content_type.as_deref().unwrap_or("unknown type"),
        );

        let result = self.run_stages(upload.path(), options, &mut stage).await;
        match result {
            Ok(audio) => Ok(AudioArtifact {
                audio,
                upload: upload.file,
            }),
            Err(e) => {
                tracing::warn!("Pipeline failed after stage '{}' ({}): {}", stage, e.kind(), e);
                if let Err(io_err) = upload.file.remove().await {
                    tracing::warn!("Failed to remove upload after error: {}", io_err);
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        upload_path: &Path,
        options: &ConversionOptions,
        stage: &mut PipelineStage,
    ) -> Result<TempFile, PipelineError> {
        let text = self.extractor.extract(upload_path).await?;
        *stage = PipelineStage::Extracted;
        tracing::debug!("Pipeline {}: {} chars", stage, text.chars().count());

        let translation = TranslationRequest::new(text, self.language_for(options));
        let translated = self.translator.translate(&translation).await?;
        if translated.trim().is_empty() {
            return Err(PipelineError::translation(
                crate::translate::EMPTY_TRANSLATION_MESSAGE,
            ));
        }
        *stage = PipelineStage::Translated;
        tracing::debug!(
            "Pipeline {}: {} chars ({})",
            stage,
            translated.chars().count(),
            translation.target_language
        );

        let synthesis = SynthesisRequest::new(translated, self.voice_for(options));
        let audio_bytes = self.synthesizer.synthesize(&synthesis).await?;
        let audio = self
            .storage
            .write_audio(&audio_bytes)
            .await
            .map_err(|e| synthesis_failure(format!("could not store audio: {}", e)))?;
        *stage = PipelineStage::Synthesized;
        tracing::debug!(
            "Pipeline {}: {} bytes at {:?}",
            stage,
            audio_bytes.len(),
            audio.path()
        );

        Ok(audio)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
