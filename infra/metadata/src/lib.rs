//! # Metadata Store
//!
//! Persistence of the namespace index and its entries behind the [`MetadataStore`]
//! contract: point reads, a listing by parent, and conditional multi-item commits
//! guarded by the index version (and each entry's own version).
//!
//! ## Backends
//! - [`MemoryMetadataStore`]: process-local, for tests and single-process tools.
//! - `SurrealMetadataStore` (feature `surreal`): any `SurrealDB` engine (`mem://`,
//!   `rocksdb://`, `ws://`, `http://`), with health-check retries at connect.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use loft_domain::{Entry, Index};
//! use loft_metadata::{MemoryMetadataStore, MetadataError, MetadataStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MetadataError> {
//!     let store = MemoryMetadataStore::new();
//!     store.initialize(&Entry::root("r00t", Utc::now()), &Index::bootstrap("r00t")).await?;
//!
//!     let index = store.get_index().await?;
//!     let docs = Entry::directory("d0cs", "r00t", "docs", Utc::now());
//!     let mut entries = index.entries.clone();
//!     entries.insert("/docs".to_owned(), docs.id.clone());
//!     store.commit_entry_and_index(&docs, &index.successor(entries)).await?;
//!
//!     // A second commit built from the same snapshot loses the race.
//!     let stale = store.commit_entry_and_index(&docs, &index.bumped()).await;
//!     assert!(stale.unwrap_err().is_conflict());
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod store;
#[cfg(feature = "surreal")]
mod surreal;

pub use error::{MetadataError, MetadataErrorExt};
pub use memory::MemoryMetadataStore;
pub use store::MetadataStore;
#[cfg(feature = "surreal")]
pub use surreal::{SurrealMetadataStore, SurrealMetadataStoreBuilder};
