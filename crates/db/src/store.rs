//! Content-addressed file storage.
//!
//! A stored file's name is a pure function of its bytes: the lowercase
//! SHA-256 hex digest plus the uploaded file's original extension.
//! Identical content always lands on the identical path, so re-saving is a
//! benign overwrite and no existence check is made before writing.
//!
//! Saving performs no cleanup of its own on failure; undoing writes is the
//! transaction coordinator's job.

use std::path::Path;

use dbarena_core::hashing;

use crate::error::DbError;

/// An uploaded file: raw bytes plus the name the client declared.
///
/// Only the extension of `original_name` influences the stored name.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content: Vec<u8>,
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(content: impl Into<Vec<u8>>, original_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            original_name: original_name.into(),
        }
    }
}

/// Derive the stored filename for `content` uploaded as `original_name`.
pub fn stored_filename(content: &[u8], original_name: &str) -> String {
    let digest = hashing::sha256_hex(content);
    match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{digest}.{ext}"),
        None => digest,
    }
}

/// Write `file` into `dir` under its content-addressed name.
///
/// Returns the filename (not the full path) on success.
pub async fn save_file(file: &UploadedFile, dir: &Path) -> Result<String, DbError> {
    let filename = stored_filename(&file.content, &file.original_name);
    let dest = dir.join(&filename);

    tokio::fs::write(&dest, &file.content).await?;
    tracing::debug!(
        file = %dest.display(),
        bytes = file.content.len(),
        "stored content-addressed file"
    );
    Ok(filename)
}
