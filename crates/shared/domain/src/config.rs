use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level Loft configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoftConfigInner {
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct LoftConfig {
    #[serde(flatten, default)]
    inner: Arc<LoftConfigInner>,
}

impl Deref for LoftConfig {
    type Target = LoftConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for LoftConfig {
    fn deref_mut(&mut self) -> &mut LoftConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Local blob store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub create: bool,
    /// Part size of streaming uploads, in bytes.
    pub chunk_size: usize,
    /// Minimum age before an unreferenced blob is swept.
    pub orphan_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    #[default]
    Memory,
    Surreal,
}

/// Metadata store settings. `url`, `namespace`, `database` and `credentials`
/// only apply to the `surreal` backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<MetadataCredentials>,
}

/// Root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataCredentials {
    pub username: String,
    pub password: String,
}

/// Optimistic concurrency retry and upload policy of the namespace engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Bodies below this size use the whole-body `put`.
    pub small_object_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/blobs"),
            create: true,
            chunk_size: 10 * 1024 * 1024,
            orphan_grace_secs: 3600,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Memory,
            url: "mem://".to_owned(),
            namespace: "loft".to_owned(),
            database: "namespace".to_owned(),
            credentials: None,
        }
    }
}

impl Default for MetadataCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            base_backoff_ms: 10,
            max_backoff_ms: 500,
            small_object_threshold: 5 * 1024 * 1024,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), dir: None, json: false }
    }
}
