use crate::error::{StorageError, StorageErrorExt};
use crate::local::{LocalBlobStore, LocalBlobStoreInner};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

/// Multipart part size used by [`PhysicalStore::put_large`](crate::PhysicalStore::put_large).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
struct StoreConfig {
    create: bool,
    chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { create: true, chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct LocalBlobStoreBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StoreConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> LocalBlobStoreBuilder<S> {
    #[must_use = "Sets whether the store root should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    /// Part size for streaming uploads. Zero is treated as one byte.
    #[must_use = "Sets the multipart part size"]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes.max(1);
        self
    }

    fn transition<N: Sealed>(self, state: N) -> LocalBlobStoreBuilder<N> {
        LocalBlobStoreBuilder { state, config: self.config }
    }
}

impl LocalBlobStoreBuilder<NoRoot> {
    #[must_use = "Creates a new blob store builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the blob store"]
    pub fn root(self, path: impl Into<PathBuf>) -> LocalBlobStoreBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl LocalBlobStoreBuilder<WithRoot> {
    /// Creates (optionally) and canonicalizes the root, then purges uploads that
    /// were interrupted by a previous crash.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root does not exist and `create` is false,
    /// or if it cannot be created or resolved.
    pub async fn connect(self) -> Result<LocalBlobStore, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap blob store root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve blob store root: {}", root.display()))?;

        info!(path = %canonical.display(), chunk_size = self.config.chunk_size, "Blob store connected");

        let store = LocalBlobStore {
            inner: Arc::new(LocalBlobStoreInner {
                root: canonical,
                chunk_size: self.config.chunk_size,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        store.purge_tmp().await;

        Ok(store)
    }
}
