use crate::engine::NamespaceEngine;
use crate::error::NamespaceError;
use crate::path::NormalizedPath;
use loft_domain::FileInfo;
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;

/// A directory opened for listing.
#[derive(Debug)]
pub struct DirHandle<M: MetadataStore, P: PhysicalStore> {
    engine: NamespaceEngine<M, P>,
    path: NormalizedPath,
    info: FileInfo,
}

impl<M: MetadataStore, P: PhysicalStore> DirHandle<M, P> {
    pub(crate) const fn new(
        engine: NamespaceEngine<M, P>,
        path: NormalizedPath,
        info: FileInfo,
    ) -> Self {
        Self { engine, path, info }
    }

    #[must_use]
    pub const fn path(&self) -> &NormalizedPath {
        &self.path
    }

    #[must_use]
    pub const fn stat(&self) -> &FileInfo {
        &self.info
    }

    /// Current children, read from a fresh index.
    ///
    /// # Errors
    /// [`NamespaceError::NotFound`] if the directory was removed after opening.
    pub async fn list(&self) -> Result<Vec<FileInfo>, NamespaceError> {
        let entry = self.engine.resolve(&self.path).await?;
        self.engine.list_entry(&self.path, &entry).await
    }

    #[must_use]
    pub fn close(self) -> FileInfo {
        self.info
    }
}
