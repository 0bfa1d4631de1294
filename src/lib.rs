//! docstoaudio - Documents In, Spoken Translations Out
//!
//! A small HTTP service: upload a document, get back an MP3 of its text
//! translated into the language of your choice.
//!
//! ## Pipeline
//!
//! 1. **Upload** - multipart field `docs` is stored in a temp directory
//! 2. **Extract** - DOCX (also PDF and plain text) to plain text
//! 3. **Translate** - OpenAI chat completions, target language from `language`
//! 4. **Synthesize** - OpenAI speech, voice from `tone`
//! 5. **Stream** - the MP3 is streamed back and both temp files are deleted
//!
//! ## Quick Start
//!
//! ```bash
//! OPENAI_API_KEY=sk-... docstoaudio serve --port 3000
//!
//! curl -F docs=@report.docx -F language=fr -F tone=nova \
//!     http://localhost:3000/docstoaudio -o report.mp3
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod openai;
pub mod pipeline;
pub mod server;
pub mod speech;
pub mod storage;
pub mod translate;

// Re-export commonly used types
pub use error::PipelineError;
pub use pipeline::{AudioArtifact, ConversionOptions, DocsToAudio, PipelineStage, UploadedDocument};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
