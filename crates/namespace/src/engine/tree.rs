use super::{NamespaceEngine, lookup};
use crate::error::NamespaceError;
use crate::path::{self, NormalizedPath};
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngine<M, P> {
    /// Removes `path` and everything beneath it in one commit, then deletes the
    /// freed blobs best-effort.
    ///
    /// # Errors
    /// [`NamespaceError::InvalidArgument`] for the root,
    /// [`NamespaceError::NotFound`] if the path does not exist.
    #[instrument(skip(self))]
    pub async fn remove_all(&self, path: &str) -> Result<(), NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        if path.is_root() {
            return Err(NamespaceError::invalid("The root cannot be removed"));
        }

        let ids = self.retry.run("remove_all", |_| self.try_remove(&path)).await?;
        info!(%path, removed = ids.len(), "Subtree removed");

        for id in &ids {
            match self.physical.delete(id).await {
                Ok(()) => {},
                // Directories never had a blob.
                Err(err) if err.is_not_found() => {},
                Err(err) => warn!(id = %id, error = %err, "Blob delete failed, blob orphaned"),
            }
        }
        Ok(())
    }

    async fn try_remove(&self, target: &NormalizedPath) -> Result<Vec<String>, NamespaceError> {
        let index = self.index().await?;
        lookup(&index, target)?;

        let mut ids = Vec::new();
        let mut entries = index.entries.clone();
        entries.retain(|p, id| {
            let doomed = path::is_within(p, target.as_str());
            if doomed {
                ids.push(id.clone());
            }
            !doomed
        });

        self.metadata.delete_entries_and_index(&ids, &index.successor(entries)).await?;
        Ok(ids)
    }

    /// Moves `old` (and, for a directory, its whole subtree) to `new`.
    ///
    /// Existing destinations are never overwritten.
    ///
    /// # Errors
    /// [`NamespaceError::InvalidArgument`] if either side is the root or `new` lies
    /// beneath `old`, [`NamespaceError::NotFound`] if `old` or the parent of `new`
    /// is missing, [`NamespaceError::AlreadyExists`] if `new` is taken.
    #[instrument(skip(self))]
    pub async fn rename(&self, old: &str, new: &str) -> Result<(), NamespaceError> {
        let old = NormalizedPath::try_from(old)?;
        let new = NormalizedPath::try_from(new)?;
        if old.is_root() || new.is_root() {
            return Err(NamespaceError::invalid("The root cannot be renamed"));
        }
        if new.is_descendant_of(&old) {
            return Err(NamespaceError::invalid(format!("Cannot move {old} beneath itself")));
        }
        if old == new {
            lookup(&self.index().await?, &old)?;
            return Ok(());
        }

        let moved = self.retry.run("rename", |_| self.try_rename(&old, &new)).await?;
        info!(%old, %new, moved, "Renamed");
        Ok(())
    }

    async fn try_rename(
        &self,
        old: &NormalizedPath,
        new: &NormalizedPath,
    ) -> Result<usize, NamespaceError> {
        let index = self.index().await?;
        let id = lookup(&index, old)?;
        if index.contains(new.as_str()) {
            return Err(NamespaceError::already_exists(new.to_string()));
        }
        let parent = self.parent_dir(&index, new).await?;

        let mut moved = 0;
        let mut entries = BTreeMap::new();
        for (key, entry_id) in &index.entries {
            let target = match path::rebase(key, old.as_str(), new.as_str()) {
                Some(rebased) => {
                    moved += 1;
                    rebased
                },
                None => key.clone(),
            };
            if entries.insert(target, entry_id.clone()).is_some() {
                return Err(NamespaceError::already_exists(format!(
                    "{key} collides after moving {old} to {new}"
                )));
            }
        }

        let mut entry = self.entry(id).await?;
        entry.name = new.name().to_owned();
        entry.parent_id = parent.id;
        entry.version += 1;

        let next = index.successor(entries);
        self.metadata.commit_entry_rename(&entry, &next).await?;
        debug!(id = %entry.id, version = next.version, "Rename committed");
        Ok(moved)
    }
}
