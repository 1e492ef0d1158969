use super::{EngineInner, NamespaceEngine};
use crate::error::{NamespaceError, NamespaceErrorExt};
use crate::retry::RetryPolicy;
use chrono::Utc;
use loft_domain::config::EngineConfig;
use loft_domain::constants::ROOT_PATH;
use loft_domain::{Entry, Index};
use loft_kernel::safe_nanoid;
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use private::Sealed;
use tracing::info;

#[derive(Debug, Default)]
pub struct NoMetadata;
#[derive(Debug)]
pub struct WithMetadata<M>(M);
#[derive(Debug, Default)]
pub struct NoPhysical;
#[derive(Debug)]
pub struct WithPhysical<P>(P);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoMetadata {}
impl<M> Sealed for WithMetadata<M> {}
impl Sealed for NoPhysical {}
impl<P> Sealed for WithPhysical<P> {}

#[derive(Debug, Clone)]
struct Tuning {
    retry: RetryPolicy,
    small_object_threshold: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for Tuning {
    fn from(config: &EngineConfig) -> Self {
        Self {
            retry: RetryPolicy::from(config),
            small_object_threshold: config.small_object_threshold,
        }
    }
}

/// Builder for [`NamespaceEngine`]. Both stores are required before `connect`.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct NamespaceEngineBuilder<MS: Sealed = NoMetadata, PS: Sealed = NoPhysical> {
    metadata: MS,
    physical: PS,
    tuning: Tuning,
}

impl NamespaceEngineBuilder {
    #[must_use = "Creates a new engine builder with default tuning"]
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(private_bounds)]
impl<MS: Sealed, PS: Sealed> NamespaceEngineBuilder<MS, PS> {
    #[must_use = "Sets the metadata store"]
    pub fn metadata<M: MetadataStore>(
        self,
        store: M,
    ) -> NamespaceEngineBuilder<WithMetadata<M>, PS> {
        NamespaceEngineBuilder {
            metadata: WithMetadata(store),
            physical: self.physical,
            tuning: self.tuning,
        }
    }

    #[must_use = "Sets the physical store"]
    pub fn physical<P: PhysicalStore>(
        self,
        store: P,
    ) -> NamespaceEngineBuilder<MS, WithPhysical<P>> {
        NamespaceEngineBuilder {
            metadata: self.metadata,
            physical: WithPhysical(store),
            tuning: self.tuning,
        }
    }

    #[must_use = "Sets the version conflict retry policy"]
    pub const fn retry(mut self, policy: RetryPolicy) -> Self {
        self.tuning.retry = policy;
        self
    }

    /// Bodies shorter than this go through the whole-body `put`.
    #[must_use = "Sets the small object threshold"]
    pub const fn small_object_threshold(mut self, bytes: usize) -> Self {
        self.tuning.small_object_threshold = bytes;
        self
    }

    /// Takes retry policy and threshold from an [`EngineConfig`].
    #[must_use = "Applies engine configuration"]
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.tuning = Tuning::from(config);
        self
    }
}

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngineBuilder<WithMetadata<M>, WithPhysical<P>> {
    /// Bootstraps the namespace if needed: the root entry and the first index are
    /// created together, once. Every later call finds them in place.
    ///
    /// # Errors
    /// Whatever the metadata store reports while reading or bootstrapping.
    pub async fn connect(self) -> Result<NamespaceEngine<M, P>, NamespaceError> {
        let WithMetadata(metadata) = self.metadata;
        let WithPhysical(physical) = self.physical;

        let root_id = safe_nanoid!();
        let created = metadata
            .initialize(&Entry::root(root_id.clone(), Utc::now()), &Index::bootstrap(root_id))
            .await
            .map_err(NamespaceError::from)
            .context("Namespace bootstrap failed")?;

        let index = metadata.get_index().await.map_err(NamespaceError::from)?;
        let Some(root_id) = index.get(ROOT_PATH).map(str::to_owned) else {
            return Err(NamespaceError::from("Index has no root path"));
        };

        if created {
            info!(root_id = %root_id, "Namespace bootstrapped");
        } else {
            info!(root_id = %root_id, version = index.version, "Namespace opened");
        }

        Ok(NamespaceEngine::from_inner(EngineInner {
            metadata,
            physical,
            retry: self.tuning.retry,
            small_object_threshold: self.tuning.small_object_threshold,
            root_id,
        }))
    }
}
