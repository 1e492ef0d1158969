use super::NamespaceEngine;
use crate::error::NamespaceError;
use crate::path::NormalizedPath;
use loft_domain::{PropPatch, PropStat, PropStatus};
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngine<M, P> {
    /// Applies `patches` in order to the dead properties of the entry at `path`.
    ///
    /// Guarded by the entry version alone; the index is not touched. An empty patch
    /// list writes nothing.
    ///
    /// # Errors
    /// [`NamespaceError::InvalidArgument`] for an empty property key,
    /// [`NamespaceError::NotFound`] if the path does not exist.
    #[instrument(skip(self, patches), fields(count = patches.len()))]
    pub async fn patch_properties(
        &self,
        path: &str,
        patches: &[PropPatch],
    ) -> Result<Vec<PropStat>, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        if patches.iter().any(|patch| patch.key().is_empty()) {
            return Err(NamespaceError::invalid("Empty property key"));
        }

        self.retry.run("patch_properties", |_| self.try_patch(&path, patches)).await
    }

    async fn try_patch(
        &self,
        path: &NormalizedPath,
        patches: &[PropPatch],
    ) -> Result<Vec<PropStat>, NamespaceError> {
        let mut entry = self.resolve(path).await?;
        if patches.is_empty() {
            return Ok(Vec::new());
        }

        let stats = apply(&mut entry.dead_props, patches);
        entry.version += 1;
        self.metadata.update_entry(&entry).await?;
        debug!(id = %entry.id, version = entry.version, "Properties patched");
        Ok(stats)
    }
}

fn apply(props: &mut BTreeMap<String, String>, patches: &[PropPatch]) -> Vec<PropStat> {
    patches
        .iter()
        .map(|patch| {
            let status = match patch {
                PropPatch::Set { key, value } => {
                    props.insert(key.clone(), value.clone());
                    PropStatus::Set
                },
                PropPatch::Remove { key } => {
                    if props.remove(key).is_some() {
                        PropStatus::Removed
                    } else {
                        PropStatus::Absent
                    }
                },
            };
            PropStat { key: patch.key().to_owned(), status }
        })
        .collect()
}
