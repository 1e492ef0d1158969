#![allow(dead_code)]

use loft_metadata::{MemoryMetadataStore, MetadataStore};
use loft_namespace::{NamespaceEngine, RetryPolicy};
use loft_storage::LocalBlobStore;
use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::TempDir;

pub type Engine<M = MemoryMetadataStore> = NamespaceEngine<M, LocalBlobStore>;

/// Fast retries so contention tests finish quickly.
pub fn eager_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(8),
    }
}

pub async fn blob_store(dir: &TempDir) -> LocalBlobStore {
    LocalBlobStore::builder()
        .root(dir.path().join("blobs"))
        .chunk_size(7)
        .connect()
        .await
        .expect("blob store")
}

pub async fn engine_with<M: MetadataStore>(
    metadata: M,
    retry: RetryPolicy,
) -> (Engine<M>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = NamespaceEngine::builder()
        .metadata(metadata)
        .physical(blob_store(&dir).await)
        .retry(retry)
        .small_object_threshold(16)
        .connect()
        .await
        .expect("engine");
    (engine, dir)
}

pub async fn engine() -> (Engine, TempDir) {
    engine_with(MemoryMetadataStore::new(), RetryPolicy::default()).await
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

/// Every index path resolves to an entry whose name and parent agree with the path,
/// and every non-root path has its parent in the index.
pub async fn assert_coherent<M: MetadataStore>(store: &M) {
    let index = store.get_index().await.expect("index");
    for (path, id) in &index.entries {
        let entry = store
            .get_entry(id)
            .await
            .unwrap_or_else(|err| panic!("{path} -> {id} has no entry: {err}"));
        if path == "/" {
            assert!(entry.is_dir());
            continue;
        }
        let parent = parent_of(path);
        let parent_id = index.get(parent).unwrap_or_else(|| panic!("{path} has no parent"));
        assert_eq!(entry.parent_id, parent_id, "parent of {path}");
        assert_eq!(Some(entry.name.as_str()), path.rsplit('/').next(), "name of {path}");
    }
}

/// No entry outlives its path.
pub async fn assert_no_stray_entries(store: &MemoryMetadataStore) {
    let index = store.get_index().await.expect("index");
    let referenced: BTreeSet<String> = index.entries.values().cloned().collect();
    let stored: BTreeSet<String> = store.entry_ids().into_iter().collect();
    assert_eq!(stored, referenced);
}

pub async fn paths<M: MetadataStore>(store: &M) -> Vec<String> {
    store.get_index().await.expect("index").entries.into_keys().collect()
}
