//! Artifact storage collaborator.

use async_trait::async_trait;
use serde::Serialize;

use pixelforge_core::ImageModel;

mod fs;

pub use fs::FsArtifactStore;

/// Artifact store failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArtifactStoreError {
    #[error("artifact write failed: {0}")]
    Write(String),
}

/// Descriptive metadata persisted alongside an artifact for auditability.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMetadata {
    pub prompt: String,
    pub model: ImageModel,
    pub generation_ms: u64,
}

/// Stores artifact bytes under a derived name, returning a public reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(
        &self,
        bytes: &[u8],
        name: &str,
        metadata: &ArtifactMetadata,
    ) -> Result<String, ArtifactStoreError>;
}
