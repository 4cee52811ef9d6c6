use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::storage::{is_safe_file_name, ArtifactStore, StorageError};

/// Writes artifacts under the upload directory; they are served back by
/// `GET /api/v1/files/:filename`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if !is_safe_file_name(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, &bytes).await?;
        info!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(format!("{}/api/v1/files/{name}", self.public_base_url))
    }
}
