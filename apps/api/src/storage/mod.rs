//! Persistence for generated documents.
//!
//! Backends are interchangeable behind [`ArtifactStore`]; the one in use is
//! picked from configuration at start-up and injected through `AppState`.

pub mod local;
pub mod s3;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalStore;
pub use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("upload timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `name` and returns a URL the caller can fetch it from.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;
}

/// Accepts a bare file name: no separators, no parent references, not empty.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Content type for a stored file, inferred from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
