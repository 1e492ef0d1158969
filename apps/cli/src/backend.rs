use crate::args::Command;
use crate::commands::execute;
use anyhow::{Context, Result};
use loft_domain::config::{LoftConfig, MetadataBackend, StorageConfig};
use loft_metadata::{MemoryMetadataStore, MetadataStore};
use loft_namespace::NamespaceEngine;
use loft_storage::LocalBlobStore;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::warn;

/// Opens the configured stores, bootstraps the namespace and runs `command`.
///
/// # Errors
/// Fails if a store cannot be reached, the namespace cannot be bootstrapped or
/// the command itself fails.
pub async fn run<W>(command: Command, config: &LoftConfig, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let physical = open_blob_store(&config.storage).await?;
    let grace = Duration::from_secs(config.storage.orphan_grace_secs);

    match config.metadata.backend {
        MetadataBackend::Memory => {
            warn!("Memory metadata backend: the namespace is discarded when loft exits");
            let engine = connect(MemoryMetadataStore::new(), physical, config).await?;
            execute(&engine, command, grace, out).await
        },
        MetadataBackend::Surreal => run_surreal(command, config, physical, grace, out).await,
    }
}

async fn open_blob_store(storage: &StorageConfig) -> Result<LocalBlobStore> {
    LocalBlobStore::builder()
        .root(&storage.root)
        .create(storage.create)
        .chunk_size(storage.chunk_size)
        .connect()
        .await
        .with_context(|| format!("Failed to open the blob store at {}", storage.root.display()))
}

async fn connect<M: MetadataStore>(
    metadata: M,
    physical: LocalBlobStore,
    config: &LoftConfig,
) -> Result<NamespaceEngine<M, LocalBlobStore>> {
    NamespaceEngine::builder()
        .metadata(metadata)
        .physical(physical)
        .config(&config.engine)
        .connect()
        .await
        .context("Failed to bootstrap the namespace")
}

#[cfg(feature = "surreal")]
async fn run_surreal<W>(
    command: Command,
    config: &LoftConfig,
    physical: LocalBlobStore,
    grace: Duration,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let settings = &config.metadata;
    let mut builder = loft_metadata::SurrealMetadataStore::builder()
        .url(&settings.url)
        .session(&settings.namespace, &settings.database);
    if let Some(credentials) = &settings.credentials {
        builder = builder.auth(&credentials.username, &credentials.password);
    }
    let metadata = builder
        .connect()
        .await
        .with_context(|| format!("Failed to connect to the metadata store at {}", settings.url))?;

    let engine = connect(metadata, physical, config).await?;
    execute(&engine, command, grace, out).await
}

#[cfg(not(feature = "surreal"))]
#[allow(clippy::unused_async)]
async fn run_surreal<W>(
    _command: Command,
    _config: &LoftConfig,
    _physical: LocalBlobStore,
    _grace: Duration,
    _out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    anyhow::bail!("This build of loft has no SurrealDB support, rebuild with `--features surreal`")
}
