//! Path-oriented operations over a [`MetadataStore`] and a [`PhysicalStore`].
//!
//! Every namespace mutation reads the index, derives a candidate successor and
//! submits it as one conditional commit. Conflicts are retried against a fresh
//! index by [`RetryPolicy`]; the engine holds no lock of its own.

mod builder;
mod props;
mod sweep;
mod tree;
mod write;

pub use builder::{NamespaceEngineBuilder, NoMetadata, NoPhysical, WithMetadata, WithPhysical};
pub use sweep::SweepReport;
pub(crate) use write::PendingWrite;

use crate::error::NamespaceError;
use crate::handle::{DirHandle, FileHandle, ReadHandle};
use crate::path::NormalizedPath;
use crate::retry::RetryPolicy;
use loft_domain::{Entry, FileInfo, Index};
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use tracing::instrument;

/// The shared state of a [`NamespaceEngine`].
#[derive(Debug)]
pub struct EngineInner<M, P> {
    pub(crate) metadata: M,
    pub(crate) physical: P,
    pub(crate) retry: RetryPolicy,
    pub(crate) small_object_threshold: usize,
    pub(crate) root_id: String,
}

impl<M, P> EngineInner<M, P> {
    #[must_use]
    pub const fn metadata(&self) -> &M {
        &self.metadata
    }

    #[must_use]
    pub const fn physical(&self) -> &P {
        &self.physical
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Id of the root directory entry.
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root_id
    }
}

/// A cheaply clonable handle to the namespace.
///
/// ```rust
/// use loft_metadata::MemoryMetadataStore;
/// use loft_namespace::NamespaceEngine;
/// use loft_storage::LocalBlobStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     # let tmp = tempfile::tempdir()?;
///     let engine = NamespaceEngine::builder()
///         .metadata(MemoryMetadataStore::new())
///         .physical(LocalBlobStore::builder().root(tmp.path()).connect().await?)
///         .connect()
///         .await?;
///
///     engine.mkdir("/docs", 0o755).await?;
///     engine.write("/docs/readme.txt", b"hello").await?;
///
///     let info = engine.stat("/docs/readme.txt").await?;
///     assert_eq!(info.size, 5);
///     assert_eq!(engine.list("/docs").await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct NamespaceEngine<M, P> {
    inner: Arc<EngineInner<M, P>>,
}

impl<M, P> Clone for NamespaceEngine<M, P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<M, P> Deref for NamespaceEngine<M, P> {
    type Target = EngineInner<M, P>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl NamespaceEngine<(), ()> {
    #[must_use = "The engine is not ready until you call .connect()"]
    pub fn builder() -> NamespaceEngineBuilder {
        NamespaceEngineBuilder::new()
    }
}

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngine<M, P> {
    pub(crate) fn from_inner(inner: EngineInner<M, P>) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// File info of the entry at `path`.
    ///
    /// # Errors
    /// [`NamespaceError::NotFound`] if the path does not exist.
    #[instrument(skip(self))]
    pub async fn stat(&self, path: &str) -> Result<FileInfo, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        Ok(self.resolve(&path).await?.info())
    }

    /// Children of the directory at `path`, sorted by name.
    ///
    /// # Errors
    /// [`NamespaceError::NotSupported`] if `path` is a file.
    #[instrument(skip(self))]
    pub async fn list(&self, path: &str) -> Result<Vec<FileInfo>, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        let entry = self.resolve(&path).await?;
        self.list_entry(&path, &entry).await
    }

    /// Stored dead properties of the entry at `path`.
    #[instrument(skip(self))]
    pub async fn dead_props(&self, path: &str) -> Result<BTreeMap<String, String>, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        Ok(self.resolve(&path).await?.dead_props)
    }

    /// Opens a file for reading or a directory for listing.
    #[instrument(skip(self))]
    pub async fn open_for_read_or_list(
        &self,
        path: &str,
    ) -> Result<FileHandle<M, P>, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        let entry = self.resolve(&path).await?;
        if entry.is_dir() {
            return Ok(FileHandle::Directory(DirHandle::new(self.clone(), path, entry.info())));
        }
        let reader = self.physical.get(&entry.id).await?;
        Ok(FileHandle::Read(ReadHandle::new(path, entry.info(), reader)))
    }

    /// # Errors
    /// [`NamespaceError::NotSupported`] if `path` is a directory.
    pub async fn open_read(&self, path: &str) -> Result<ReadHandle<P>, NamespaceError> {
        match self.open_for_read_or_list(path).await? {
            FileHandle::Read(handle) => Ok(handle),
            other => Err(NamespaceError::not_supported(format!("{} is a directory", other.path()))),
        }
    }

    /// # Errors
    /// [`NamespaceError::NotSupported`] if `path` is a file.
    pub async fn open_dir(&self, path: &str) -> Result<DirHandle<M, P>, NamespaceError> {
        match self.open_for_read_or_list(path).await? {
            FileHandle::Directory(handle) => Ok(handle),
            other => {
                Err(NamespaceError::not_supported(format!("{} is not a directory", other.path())))
            },
        }
    }

    pub(crate) async fn list_entry(
        &self,
        path: &NormalizedPath,
        entry: &Entry,
    ) -> Result<Vec<FileInfo>, NamespaceError> {
        if !entry.is_dir() {
            return Err(NamespaceError::not_supported(format!("{path} is not a directory")));
        }
        let mut children: Vec<FileInfo> = self
            .metadata
            .list_entries_by_parent(&entry.id)
            .await?
            .iter()
            .map(Entry::info)
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    pub(crate) async fn index(&self) -> Result<Index, NamespaceError> {
        Ok(self.metadata.get_index().await?)
    }

    pub(crate) async fn entry(&self, id: &str) -> Result<Entry, NamespaceError> {
        Ok(self.metadata.get_entry(id).await?)
    }

    /// Entry at `path` in a fresh index.
    pub(crate) async fn resolve(&self, path: &NormalizedPath) -> Result<Entry, NamespaceError> {
        let index = self.index().await?;
        let id = lookup(&index, path)?;
        self.entry(id).await
    }

    /// Directory entry that would contain `path`, resolved against `index`.
    pub(crate) async fn parent_dir(
        &self,
        index: &Index,
        path: &NormalizedPath,
    ) -> Result<Entry, NamespaceError> {
        let Some(parent) = path.parent() else {
            return Err(NamespaceError::invalid("The root has no parent"));
        };
        let Some(id) = index.get(parent.as_str()) else {
            return Err(NamespaceError::not_found(format!("Parent of {path} does not exist")));
        };
        let entry = self.entry(id).await?;
        if !entry.is_dir() {
            return Err(NamespaceError::invalid(format!("{parent} is not a directory")));
        }
        Ok(entry)
    }
}

pub(crate) fn lookup<'a>(
    index: &'a Index,
    path: &NormalizedPath,
) -> Result<&'a str, NamespaceError> {
    index.get(path.as_str()).ok_or_else(|| NamespaceError::not_found(path.to_string()))
}
