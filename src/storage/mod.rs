//! Temporary Storage
//!
//! Request-scoped files live in one directory shared by all requests. Names are
//! unique per call, so concurrent requests never need to coordinate. Every file
//! handed out is owned by a [`TempFile`] guard which deletes it exactly once.

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload/audio scratch directory.
#[derive(Debug, Clone)]
pub struct TempStorage {
    dir: PathBuf,
}

impl TempStorage {
    /// Open the storage directory, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh path for an uploaded document. The original extension is kept
    /// when it looks sane so format detection can fall back on it.
    pub fn upload_path(&self, original_name: Option<&str>) -> PathBuf {
        let mut name = Uuid::new_v4().simple().to_string();
        if let Some(ext) = original_name.and_then(sanitized_extension) {
            name.push('.');
            name.push_str(&ext);
        }
        self.dir.join(name)
    }

    /// Fresh path for generated audio: `<unix-millis>_<random>_output.mp3`.
    pub fn audio_path(&self) -> PathBuf {
        let suffix = Uuid::new_v4().simple().to_string();
        self.dir.join(format!(
            "{}_{}_output.mp3",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    /// Write generated audio to a new file. If the write fails the partial
    /// file is removed before the error is returned.
    pub async fn write_audio(&self, bytes: &[u8]) -> io::Result<TempFile> {
        let file = TempFile::new(self.audio_path());
        tokio::fs::write(file.path(), bytes).await?;
        Ok(file)
    }
}

fn sanitized_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Owner of one temporary file. The file is deleted by [`TempFile::remove`] or,
/// failing that, when the guard is dropped.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    /// Take ownership of `path`. The file does not have to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. A file that is already gone counts as removed.
    pub async fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("Removed temp file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed temp file {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove temp file {:?}: {}", self.path, e),
        }
    }
}
