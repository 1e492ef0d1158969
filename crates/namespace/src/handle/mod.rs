//! Session objects returned by the engine's open operations.
//!
//! The variant is chosen at open time and fixes the capabilities: a read handle
//! reads and seeks, a write handle writes and commits on close, a directory handle
//! lists.

mod dir;
mod read;
mod write;

pub use dir::DirHandle;
pub use read::ReadHandle;
pub use write::WriteHandle;

use crate::error::NamespaceError;
use crate::path::NormalizedPath;
use loft_domain::FileInfo;
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;

#[derive(Debug)]
pub enum FileHandle<M: MetadataStore, P: PhysicalStore> {
    Read(ReadHandle<P>),
    Write(WriteHandle<M, P>),
    Directory(DirHandle<M, P>),
}

impl<M: MetadataStore, P: PhysicalStore> FileHandle<M, P> {
    #[must_use]
    pub const fn path(&self) -> &NormalizedPath {
        match self {
            Self::Read(handle) => handle.path(),
            Self::Write(handle) => handle.path(),
            Self::Directory(handle) => handle.path(),
        }
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Ends the session. For a write handle this commits the content; a second call
    /// returns the first outcome.
    ///
    /// # Errors
    /// The commit failure of a write handle.
    pub async fn close(&mut self) -> Result<FileInfo, NamespaceError> {
        match self {
            Self::Read(handle) => Ok(handle.stat().clone()),
            Self::Directory(handle) => Ok(handle.stat().clone()),
            Self::Write(handle) => handle.close().await,
        }
    }
}
