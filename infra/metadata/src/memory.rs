//! In-process [`MetadataStore`] backed by a single lock.
//!
//! Each conditional commit validates and applies under one write lock, which gives
//! the same all-or-nothing behavior as a store-side transaction.

use crate::error::MetadataError;
use crate::store::MetadataStore;
use fxhash::FxHashMap;
use loft_domain::{Entry, Index};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    index: Option<Index>,
    entries: FxHashMap<String, Entry>,
    by_parent: FxHashMap<String, BTreeSet<String>>,
}

impl State {
    fn check_index(&self, next: &Index) -> Result<(), MetadataError> {
        let current = self.index.as_ref().ok_or_else(|| MetadataError::not_found("index"))?;
        if current.version + 1 == next.version {
            Ok(())
        } else {
            Err(MetadataError::conflict(format!(
                "index is at version {}, commit expected {}",
                current.version,
                next.version.saturating_sub(1)
            )))
        }
    }

    fn check_entry(&self, entry: &Entry) -> Result<(), MetadataError> {
        match (self.entries.get(&entry.id), entry.version) {
            (None, 1) => Ok(()),
            (Some(stored), v) if stored.version + 1 == v => Ok(()),
            (stored, v) => Err(MetadataError::conflict(format!(
                "entry {} is at version {}, write carries {v}",
                entry.id,
                stored.map_or(0, |s| s.version)
            ))),
        }
    }

    fn put_entry(&mut self, entry: Entry) {
        let previous_parent = self.entries.get(&entry.id).map(|p| p.parent_id.clone());
        if let Some(parent) = previous_parent
            && parent != entry.parent_id
        {
            self.unlink(&parent, &entry.id);
        }
        self.by_parent.entry(entry.parent_id.clone()).or_default().insert(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    fn remove_entry(&mut self, id: &str) {
        if let Some(removed) = self.entries.remove(id) {
            self.unlink(&removed.parent_id, id);
        }
    }

    fn unlink(&mut self, parent_id: &str, id: &str) {
        if let Some(children) = self.by_parent.get_mut(parent_id) {
            children.remove(id);
            if children.is_empty() {
                self.by_parent.remove(parent_id);
            }
        }
    }
}

/// Shared, cloneable in-memory metadata store. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    state: Arc<RwLock<State>>,
}

impl MemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored entry, sorted.
    #[must_use]
    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().entries.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

impl MetadataStore for MemoryMetadataStore {
    async fn get_index(&self) -> Result<Index, MetadataError> {
        self.state.read().index.clone().ok_or_else(|| MetadataError::not_found("index"))
    }

    async fn get_entry(&self, id: &str) -> Result<Entry, MetadataError> {
        self.state
            .read()
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::not_found(format!("entry {id}")))
    }

    async fn list_entries_by_parent(&self, parent_id: &str) -> Result<Vec<Entry>, MetadataError> {
        let state = self.state.read();
        Ok(state
            .by_parent
            .get(parent_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.entries.get(id).cloned())
            .collect())
    }

    async fn commit_entry_and_index(&self, entry: &Entry, index: &Index) -> Result<(), MetadataError> {
        let mut state = self.state.write();
        state.check_index(index)?;
        state.check_entry(entry)?;

        state.put_entry(entry.clone());
        state.index = Some(index.clone());
        debug!(id = %entry.id, version = index.version, "Committed entry and index");
        Ok(())
    }

    async fn commit_entry_rename(&self, entry: &Entry, index: &Index) -> Result<(), MetadataError> {
        let mut state = self.state.write();
        state.check_index(index)?;
        if !state.entries.contains_key(&entry.id) {
            return Err(MetadataError::not_found(format!("entry {}", entry.id)));
        }
        state.check_entry(entry)?;

        state.put_entry(entry.clone());
        state.index = Some(index.clone());
        debug!(id = %entry.id, version = index.version, "Committed rename");
        Ok(())
    }

    async fn delete_entries_and_index(&self, ids: &[String], index: &Index) -> Result<(), MetadataError> {
        let mut state = self.state.write();
        state.check_index(index)?;

        for id in ids {
            state.remove_entry(id);
        }
        state.index = Some(index.clone());
        debug!(removed = ids.len(), version = index.version, "Committed deletion");
        Ok(())
    }

    async fn update_entry(&self, entry: &Entry) -> Result<(), MetadataError> {
        let mut state = self.state.write();
        if !state.entries.contains_key(&entry.id) {
            return Err(MetadataError::not_found(format!("entry {}", entry.id)));
        }
        state.check_entry(entry)?;

        state.put_entry(entry.clone());
        Ok(())
    }

    async fn initialize(&self, root: &Entry, index: &Index) -> Result<bool, MetadataError> {
        let mut state = self.state.write();
        if state.index.is_some() {
            return Ok(false);
        }

        state.put_entry(root.clone());
        state.index = Some(index.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bootstrapped() -> (MemoryMetadataStore, Index) {
        let store = MemoryMetadataStore::new();
        let index = Index::bootstrap("r00t");
        let mut state = store.state.write();
        state.put_entry(Entry::root("r00t", Utc::now()));
        state.index = Some(index.clone());
        drop(state);
        (store, index)
    }

    #[test]
    fn index_guard_requires_successor_version() {
        let (store, index) = bootstrapped();
        let state = store.state.read();

        assert!(state.check_index(&index.bumped()).is_ok());
        assert!(state.check_index(&index).unwrap_err().is_conflict());
        assert!(state.check_index(&index.bumped().bumped()).unwrap_err().is_conflict());
    }

    #[test]
    fn entry_guard_distinguishes_new_and_existing() {
        let (store, _) = bootstrapped();
        let state = store.state.read();

        let fresh = Entry::directory("d1", "r00t", "docs", Utc::now());
        assert!(state.check_entry(&fresh).is_ok());

        let mut root = state.entries["r00t"].clone();
        assert!(state.check_entry(&root).unwrap_err().is_conflict(), "root already exists at v1");
        root.version = 2;
        assert!(state.check_entry(&root).is_ok());
    }

    #[test]
    fn reparent_moves_secondary_index() {
        let (store, _) = bootstrapped();
        let mut state = store.state.write();
        state.put_entry(Entry::directory("d1", "r00t", "a", Utc::now()));
        state.put_entry(Entry::directory("d2", "r00t", "b", Utc::now()));
        let mut file = Entry::file("f1", "d1", "x", 1, Utc::now());
        state.put_entry(file.clone());

        file.parent_id = "d2".to_owned();
        state.put_entry(file);

        assert!(!state.by_parent.contains_key("d1"));
        assert!(state.by_parent["d2"].contains("f1"));
    }
}
