//! # Namespace Engine
//!
//! Hierarchical paths on top of a flat, versioned index. The index maps every live
//! normalized path to an entry id; entries carry metadata; blobs carry content.
//!
//! Each namespace mutation is one conditional commit of an entry change together
//! with the successor index. Concurrent writers race on the index version: exactly
//! one commit wins, the others re-read and retry under a bounded, jittered
//! [`RetryPolicy`]. Content is written to the [`PhysicalStore`](loft_storage::PhysicalStore)
//! before the commit that makes it visible, so a failed commit can only leave an
//! unreferenced blob behind, which [`NamespaceEngine::sweep_orphans`] collects.
//!
//! ## Operations
//! - `mkdir`, `create_or_update`, `write`, `open_for_write`, `create_or_open_for_write`
//! - `stat`, `list`, `open_for_read_or_list`, `open_read`, `open_dir`
//! - `remove_all` (recursive), `rename` (whole subtree, never overwrites)
//! - `patch_properties`, `dead_props`
//! - `sweep_orphans`
//!
//! ## Example
//!
//! ```rust
//! use loft_domain::OpenFlags;
//! use loft_metadata::MemoryMetadataStore;
//! use loft_namespace::NamespaceEngine;
//! use loft_storage::LocalBlobStore;
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     # let tmp = tempfile::tempdir()?;
//!     let engine = NamespaceEngine::builder()
//!         .metadata(MemoryMetadataStore::new())
//!         .physical(LocalBlobStore::builder().root(tmp.path()).connect().await?)
//!         .connect()
//!         .await?;
//!
//!     let mut upload = engine.open_for_write("/notes.txt", OpenFlags::CREATE, 0o644).await?;
//!     upload.write(b"streamed ").await?;
//!     upload.write(b"body").await?;
//!     assert_eq!(upload.close().await?.size, 13);
//!
//!     engine.rename("/notes.txt", "/archive.txt").await?;
//!
//!     let mut body = String::new();
//!     engine.open_read("/archive.txt").await?.read_to_string(&mut body).await?;
//!     assert_eq!(body, "streamed body");
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod handle;
mod path;
mod retry;

pub use engine::{
    EngineInner, NamespaceEngine, NamespaceEngineBuilder, NoMetadata, NoPhysical, SweepReport,
    WithMetadata, WithPhysical,
};
pub use error::{ErrorKind, NamespaceError, NamespaceErrorExt};
pub use handle::{DirHandle, FileHandle, ReadHandle, WriteHandle};
pub use path::NormalizedPath;
pub use retry::RetryPolicy;
