//! Filesystem-backed artifact store.
//!
//! Writes the image under a configured directory and a sidecar JSON file
//! with the metadata; the public reference is `base_url/name`. A reverse
//! proxy or static file server is expected to serve the directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{ArtifactMetadata, ArtifactStore, ArtifactStoreError};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    base_url: String,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(
        &self,
        bytes: &[u8],
        name: &str,
        metadata: &ArtifactMetadata,
    ) -> Result<String, ArtifactStoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ArtifactStoreError::Write(e.to_string()))?;

        let path = self.root.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ArtifactStoreError::Write(format!("{}: {e}", path.display())))?;

        let meta_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ArtifactStoreError::Write(e.to_string()))?;
        let meta_path = self.root.join(format!("{name}.json"));
        tokio::fs::write(&meta_path, meta_json)
            .await
            .map_err(|e| ArtifactStoreError::Write(format!("{}: {e}", meta_path.display())))?;

        let url = format!("{}/{}", self.base_url, name);
        debug!(path = %path.display(), %url, "artifact stored");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelforge_core::ImageModel;

    #[tokio::test]
    async fn writes_artifact_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path(), "https://img.example/");

        let meta = ArtifactMetadata {
            prompt: "a red apple".into(),
            model: ImageModel::Fast,
            generation_ms: 1200,
        };
        let url = store
            .store(b"\x89PNG\r\n", "20240101000000-a-red-apple.png", &meta)
            .await
            .unwrap();

        assert_eq!(url, "https://img.example/20240101000000-a-red-apple.png");

        let written = std::fs::read(dir.path().join("20240101000000-a-red-apple.png")).unwrap();
        assert_eq!(written, b"\x89PNG\r\n");

        let meta_raw =
            std::fs::read(dir.path().join("20240101000000-a-red-apple.png.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&meta_raw).unwrap();
        assert_eq!(parsed["prompt"], "a red apple");
        assert_eq!(parsed["model"], "fast");
        assert_eq!(parsed["generation_ms"], 1200);
    }
}
