//! Local filesystem implementation of [`PhysicalStore`].
//!
//! Blobs are sharded by id prefix under a canonicalized root and replaced via the
//! atomic swap pattern: unique temp file, `fsync`, `rename`.

use crate::builder::LocalBlobStoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, TMP_MARKER};
use crate::security;
use crate::store::{BlobInfo, PhysicalStore};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// The shared state of a [`LocalBlobStore`].
#[derive(Debug)]
pub struct LocalBlobStoreInner {
    /// Canonicalized physical root.
    pub(crate) root: PathBuf,
    pub(crate) chunk_size: usize,
    pub(crate) tmp_counter: AtomicU64,
}

impl LocalBlobStoreInner {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// A cheaply clonable handle to a sharded blob directory.
///
/// ```rust
/// use loft_storage::{LocalBlobStore, PhysicalStore, StorageError};
/// use tokio::io::AsyncReadExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let store = LocalBlobStore::builder().root(tmp.path().join("blobs")).connect().await?;
///
///     store.put("V1StGXR8_Z5jdHi6B", b"hello").await?;
///
///     let mut body = String::new();
///     store.get("V1StGXR8_Z5jdHi6B").await?.read_to_string(&mut body).await?;
///     assert_eq!(body, "hello");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    pub(crate) inner: Arc<LocalBlobStoreInner>,
}

impl Deref for LocalBlobStore {
    type Target = LocalBlobStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl LocalBlobStore {
    #[must_use = "The blob store is not initialized until you call .connect()"]
    pub fn builder() -> LocalBlobStoreBuilder {
        LocalBlobStoreBuilder::new()
    }

    /// Physical location of the blob for `id`.
    ///
    /// # Errors
    /// [`StorageError::InvalidKey`] if `id` is not a valid blob key.
    pub fn resolve(&self, id: &str) -> Result<PathBuf, StorageError> {
        security::resolve_sharded(&self.root, id)
    }

    /// Removes temporary files left by interrupted uploads and empty shard directories.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }

    async fn prepare(&self, id: &str) -> Result<(PathBuf, PathBuf), StorageError> {
        let resolved = self.resolve(id)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create shards for {}", resolved.display()))?;
        }
        let temp = unique_tmp_path(&resolved, &self.tmp_counter);
        Ok((resolved, temp))
    }

    async fn create_tmp(temp: &Path) -> Result<fs::File, StorageError> {
        fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp)
            .await
            .context(format!("Temp creation failed: {}", temp.display()))
    }

    async fn swap_into_place(temp: &Path, resolved: &Path) -> Result<(), StorageError> {
        if let Err(err) = fs::rename(temp, resolved).await {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(resolved)
                    .await
                    .context(format!("Failed to replace existing blob: {}", resolved.display()))?;
                fs::rename(temp, resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }
        Ok(())
    }


    async fn stream_into<R>(
        &self,
        file: &mut fs::File,
        mut reader: R,
    ) -> Result<(u64, usize), StorageError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut buf = vec![0_u8; self.chunk_size];
        let mut filled = 0;
        let mut total: u64 = 0;
        let mut parts = 0;

        loop {
            let n = reader.read(&mut buf[filled..]).await.context("Upload source read failed")?;
            if n == 0 {
                break;
            }
            filled += n;
            if filled == buf.len() {
                file.write_all(&buf).await.context("Part write failed")?;
                total += filled as u64;
                parts += 1;
                filled = 0;
            }
        }

        if filled > 0 {
            file.write_all(&buf[..filled]).await.context("Part write failed")?;
            total += filled as u64;
            parts += 1;
        }

        Ok((total, parts))
    }
}

impl PhysicalStore for LocalBlobStore {
    type Reader = fs::File;

    async fn get(&self, id: &str) -> Result<fs::File, StorageError> {
        let resolved = self.resolve(id)?;
        match fs::File::open(&resolved).await {
            Ok(file) => Ok(file),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { message: id.to_owned().into(), context: None })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    async fn put(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let (resolved, temp) = self.prepare(id).await?;
        let guard = TmpGuard::new(&temp);

        let mut file = Self::create_tmp(&temp).await?;
        file.write_all(data).await.context("Write failed")?;
        file.sync_all().await.context("Hardware sync failed")?;
        drop(file);

        Self::swap_into_place(&temp, &resolved).await?;
        guard.disarm();
        debug!(id, bytes = data.len(), "Blob stored");
        Ok(())
    }

    async fn put_large<R>(&self, id: &str, reader: R) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (resolved, temp) = self.prepare(id).await?;
        let guard = TmpGuard::new(&temp);

        let mut file = Self::create_tmp(&temp).await?;
        let (bytes, parts) = self.stream_into(&mut file, reader).await?;
        file.sync_all().await.context("Hardware sync failed")?;
        drop(file);

        Self::swap_into_place(&temp, &resolved).await?;
        guard.disarm();
        debug!(id, bytes, parts, "Blob streamed");
        Ok(bytes)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let resolved = self.resolve(id)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(id, "Blob deleted");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { message: id.to_owned().into(), context: None })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    async fn list_blobs(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || maintenance::scan_blobs(&root))
            .await
            .map_err(|e| StorageError::Internal {
                message: e.to_string().into(),
                context: Some("Blob scan task failed".into()),
            })?
            .context("Blob scan failed")
    }

    async fn purge_partial(&self, max_age: Duration) -> Result<usize, StorageError> {
        let root = self.root.clone();
        let now = SystemTime::now();
        let (removed, failed) =
            tokio::task::spawn_blocking(move || maintenance::remove_stale(&root, now, max_age, false))
                .await
                .map_err(|e| StorageError::Internal {
                    message: e.to_string().into(),
                    context: Some("Partial upload purge task failed".into()),
                })?;
        if failed > 0 {
            warn!(removed, failed, "Some partial uploads could not be removed");
        }
        Ok(removed)
    }
}

/// Removes a temp file unless the upload that owns it reached the final swap. Runs
/// on errors and when the upload future is dropped mid-way.
#[derive(Debug)]
struct TmpGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> TmpGuard<'a> {
    const fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TmpGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Partial upload discarded"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to discard partial upload");
            },
        }
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("blob");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{counter}", std::process::id()))
}
