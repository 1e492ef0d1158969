//! Physical content storage for Loft.
//!
//! [`PhysicalStore`] is the contract the namespace engine writes file bodies
//! through: opaque bytes keyed by entry id, replaced wholesale, never partially
//! updated. [`LocalBlobStore`] implements it on a local directory.
//!
//! # Core Features
//!
//! - **Key Validation**: Blob keys are restricted to the id alphabet, so a key can never escape the root.
//! - **Atomic Writes**: Unique temp write + `fsync` + `rename`; a crash never leaves a torn blob.
//! - **Streaming Uploads**: `put_large` copies fixed-size parts and counts bytes, without buffering the body.
//! - **Sharding**: `<root>/<id[0..2]>/<id[2..4]>/<id>` keeps directories small.
//! - **Self-Healing**: Failed or cancelled uploads remove their temp file; leftovers from crashes are purged at connect and by [`PhysicalStore::purge_partial`].
//!
//! # Examples
//!
//! ```rust
//! use loft_storage::{LocalBlobStore, PhysicalStore, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let store = LocalBlobStore::builder()
//!         .root(tmp.path().join("blobs"))
//!         .chunk_size(64 * 1024)
//!         .connect()
//!         .await?;
//!
//!     let body: &[u8] = b"streamed body";
//!     let written = store.put_large("Z5jdHi6Bmy", body).await?;
//!     assert_eq!(written, 13);
//!
//!     store.delete("Z5jdHi6Bmy").await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod local;
mod maintenance;
mod security;
mod store;

pub use builder::{DEFAULT_CHUNK_SIZE, LocalBlobStoreBuilder, NoRoot, WithRoot};
pub use error::{StorageError, StorageErrorExt};
pub use local::{LocalBlobStore, LocalBlobStoreInner};
pub use store::{BlobInfo, PhysicalStore};
