//! Artifact upload.
//!
//! After the local artifacts are written they are pushed to a remote
//! content store. Upload failures never invalidate the local files.

pub mod github;

use async_trait::async_trait;

use crate::config::{AppConfig, SyncConfig};
use crate::types::EngineError;

/// A remote store for the published JSON artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactSync: Send + Sync {
    /// Create or replace `remote_path` with `content`.
    async fn upload(&self, remote_path: &str, content: &str) -> Result<(), EngineError>;

    /// Store name for logging.
    fn name(&self) -> &str;
}

/// Remote paths for the two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTargets {
    pub parlays: String,
    pub builder: String,
}

impl SyncTargets {
    /// Resolve remote paths from the env vars named in `[sync]`.
    /// The builder path falls back to `builder_path_default`.
    pub fn from_config(cfg: &SyncConfig) -> anyhow::Result<Self> {
        Ok(Self {
            parlays: AppConfig::resolve_env(&cfg.parlays_path_env)?,
            builder: AppConfig::resolve_env(&cfg.builder_path_env)
                .unwrap_or_else(|_| cfg.builder_path_default.clone()),
        })
    }
}
