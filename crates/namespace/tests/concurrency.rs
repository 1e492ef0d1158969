//! Optimistic concurrency under real and forced races.

mod common;

use chrono::Utc;
use common::{assert_coherent, assert_no_stray_entries, eager_retries, engine_with, paths};
use loft_domain::{Entry, Index, PropPatch};
use loft_metadata::{MemoryMetadataStore, MetadataError, MetadataStore};
use loft_namespace::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the rival writer commits right before a delegated commit.
#[derive(Debug, Clone, Copy)]
enum Rival {
    Mkdir(&'static str),
    RemoveTree(&'static str),
}

/// Delegates to a memory store, but lets a rival commit land first, for the next
/// `budget` mutating calls.
#[derive(Debug, Clone)]
struct ConflictInjector {
    inner: MemoryMetadataStore,
    rival: Rival,
    budget: Arc<AtomicUsize>,
    injected: Arc<AtomicUsize>,
}

impl ConflictInjector {
    fn new(inner: MemoryMetadataStore, rival: Rival, budget: usize) -> Self {
        Self {
            inner,
            rival,
            budget: Arc::new(AtomicUsize::new(budget)),
            injected: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    async fn interfere(&self) {
        let armed = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !armed {
            return;
        }
        let round = self.injected.fetch_add(1, Ordering::SeqCst);
        let index = self.inner.get_index().await.unwrap();

        match self.rival {
            Rival::Mkdir(path) => {
                let path = if round == 0 { path.to_owned() } else { format!("{path}-{round}") };
                let id = format!("rival{round}");
                let parent = index.get("/").unwrap();
                let entry = Entry::directory(&id, parent, &path[1..], Utc::now());
                let mut entries = index.entries.clone();
                entries.insert(path, id);
                let next = index.successor(entries);
                self.inner.commit_entry_and_index(&entry, &next).await.unwrap();
            },
            Rival::RemoveTree(path) => {
                let mut ids = Vec::new();
                let mut entries = index.entries.clone();
                entries.retain(|p, id| {
                    let doomed = p == path || p.starts_with(&format!("{path}/"));
                    if doomed {
                        ids.push(id.clone());
                    }
                    !doomed
                });
                let next = index.successor(entries);
                self.inner.delete_entries_and_index(&ids, &next).await.unwrap();
            },
        }
    }
}

impl MetadataStore for ConflictInjector {
    async fn get_index(&self) -> Result<Index, MetadataError> {
        self.inner.get_index().await
    }

    async fn get_entry(&self, id: &str) -> Result<Entry, MetadataError> {
        self.inner.get_entry(id).await
    }

    async fn list_entries_by_parent(&self, parent_id: &str) -> Result<Vec<Entry>, MetadataError> {
        self.inner.list_entries_by_parent(parent_id).await
    }

    async fn commit_entry_and_index(
        &self,
        entry: &Entry,
        index: &Index,
    ) -> Result<(), MetadataError> {
        self.interfere().await;
        self.inner.commit_entry_and_index(entry, index).await
    }

    async fn commit_entry_rename(
        &self,
        entry: &Entry,
        index: &Index,
    ) -> Result<(), MetadataError> {
        self.interfere().await;
        self.inner.commit_entry_rename(entry, index).await
    }

    async fn delete_entries_and_index(
        &self,
        ids: &[String],
        index: &Index,
    ) -> Result<(), MetadataError> {
        self.interfere().await;
        self.inner.delete_entries_and_index(ids, index).await
    }

    async fn update_entry(&self, entry: &Entry) -> Result<(), MetadataError> {
        self.inner.update_entry(entry).await
    }

    async fn initialize(&self, root: &Entry, index: &Index) -> Result<bool, MetadataError> {
        self.inner.initialize(root, index).await
    }
}

#[tokio::test]
async fn injected_conflict_is_retried_against_the_fresh_index() {
    let memory = MemoryMetadataStore::new();
    let injector = ConflictInjector::new(memory.clone(), Rival::Mkdir("/intruder"), 1);
    let (engine, _dir) = engine_with(injector.clone(), eager_retries(4)).await;

    engine.mkdir("/mine", 0).await.unwrap();

    assert_eq!(injector.injected(), 1);
    assert_eq!(paths(&memory).await, vec!["/", "/intruder", "/mine"]);
    assert_eq!(memory.get_index().await.unwrap().version, 3);
    assert_coherent(&memory).await;
    assert_no_stray_entries(&memory).await;
}

#[tokio::test]
async fn mkdir_racing_a_removal_of_its_parent_leaves_nothing_behind() {
    let memory = MemoryMetadataStore::new();
    let setup = ConflictInjector::new(memory.clone(), Rival::RemoveTree("/a"), 0);
    let (engine, _dir) = engine_with(setup.clone(), eager_retries(4)).await;
    engine.mkdir("/a", 0).await.unwrap();
    setup.budget.store(1, Ordering::SeqCst);

    let err = engine.mkdir("/a/b", 0).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(paths(&memory).await, vec!["/"]);
    assert_coherent(&memory).await;
    assert_no_stray_entries(&memory).await;
}

#[tokio::test]
async fn write_racing_a_removal_orphans_only_the_blob() {
    let memory = MemoryMetadataStore::new();
    let setup = ConflictInjector::new(memory.clone(), Rival::RemoveTree("/dir"), 0);
    let (engine, _dir) = engine_with(setup.clone(), eager_retries(4)).await;
    engine.mkdir("/dir", 0).await.unwrap();
    setup.budget.store(1, Ordering::SeqCst);

    let err = engine.write("/dir/file", b"body").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_no_stray_entries(&memory).await;
    let report = engine.sweep_orphans(std::time::Duration::ZERO).await.unwrap();
    assert_eq!(report.deleted, 1);
}

#[tokio::test]
async fn exhausted_retries_surface_unavailable_without_partial_effects() {
    let memory = MemoryMetadataStore::new();
    let injector = ConflictInjector::new(memory.clone(), Rival::Mkdir("/noise"), usize::MAX);
    let (engine, _dir) = engine_with(injector.clone(), eager_retries(2)).await;

    let err = engine.mkdir("/never", 0).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());
    assert_eq!(injector.injected(), 3);
    assert!(!paths(&memory).await.contains(&"/never".to_owned()));
    assert_coherent(&memory).await;
    assert_no_stray_entries(&memory).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_path_never_bind_two_ids() {
    for _ in 0..10 {
        let memory = MemoryMetadataStore::new();
        let (engine, _dir) = engine_with(memory.clone(), eager_retries(16)).await;

        let tasks: Vec<_> = (0..2)
            .map(|n| {
                let engine = engine.clone();
                let body = format!("writer {n}");
                tokio::spawn(async move { engine.write("/same", body.as_bytes()).await })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::AlreadyExists),
            }
        }

        assert!(successes >= 1);
        assert_eq!(paths(&memory).await, vec!["/", "/same"]);
        assert_eq!(engine.list("/").await.unwrap().len(), 1);
        assert_no_stray_entries(&memory).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mkdirs_all_land() {
    let memory = MemoryMetadataStore::new();
    let (engine, _dir) = engine_with(memory.clone(), eager_retries(64)).await;

    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.mkdir(&format!("/d{n:02}"), 0).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let index = memory.get_index().await.unwrap();
    assert_eq!(index.entries.len(), 17);
    assert_eq!(index.version, 17);
    assert_coherent(&memory).await;
    assert_no_stray_entries(&memory).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_property_patches_are_not_lost() {
    let memory = MemoryMetadataStore::new();
    let (engine, _dir) = engine_with(memory.clone(), eager_retries(64)).await;
    engine.write("/f", b"x").await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let patch = PropPatch::Set { key: format!("x:p{n}"), value: n.to_string() };
                engine.patch_properties("/f", &[patch]).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let props = engine.dead_props("/f").await.unwrap();
    assert_eq!(props.len(), 8);
    let id = memory.get_index().await.unwrap().get("/f").unwrap().to_owned();
    assert_eq!(memory.get_entry(&id).await.unwrap().version, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn renames_and_writes_interleave_coherently() {
    let memory = MemoryMetadataStore::new();
    let (engine, _dir) = engine_with(memory.clone(), eager_retries(64)).await;
    engine.mkdir("/src", 0).await.unwrap();
    engine.mkdir("/dst", 0).await.unwrap();

    let writer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for n in 0..10 {
                let _ = engine.write(&format!("/src/f{n}"), b"data").await;
            }
        })
    };
    let mover = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for n in 0..5 {
                let (from, to) =
                    if n % 2 == 0 { ("/src", "/dst/src") } else { ("/dst/src", "/src") };
                engine.rename(from, to).await.unwrap();
            }
        })
    };
    writer.await.unwrap();
    mover.await.unwrap();

    assert_coherent(&memory).await;
    assert_no_stray_entries(&memory).await;
}
