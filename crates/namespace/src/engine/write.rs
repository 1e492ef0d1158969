use super::NamespaceEngine;
use crate::error::NamespaceError;
use crate::handle::{FileHandle, WriteHandle};
use crate::path::NormalizedPath;
use chrono::Utc;
use loft_domain::{Entry, FileInfo, OpenFlags};
use loft_kernel::safe_nanoid;
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use tokio::io::AsyncRead;
use tracing::{debug, instrument, warn};

/// A write admitted against the index: content goes to `id`, then the commit binds it.
#[derive(Debug, Clone)]
pub(crate) struct PendingWrite {
    pub(crate) path: NormalizedPath,
    pub(crate) id: String,
    /// `id` was already bound to `path` when the write was admitted.
    pub(crate) replaces: bool,
}

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngine<M, P> {
    /// Creates a directory. Permission bits are accepted and ignored.
    ///
    /// # Errors
    /// [`NamespaceError::AlreadyExists`] for the root or an existing path,
    /// [`NamespaceError::NotFound`] if the parent is missing.
    #[instrument(skip(self, _mode))]
    pub async fn mkdir(&self, path: &str, _mode: u32) -> Result<(), NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        if path.is_root() {
            return Err(NamespaceError::already_exists("/"));
        }

        let id = safe_nanoid!();
        let version = self.retry.run("mkdir", |_| self.try_mkdir(&path, &id)).await?;
        debug!(%path, id = %id, version, "Directory created");
        Ok(())
    }

    async fn try_mkdir(&self, path: &NormalizedPath, id: &str) -> Result<u64, NamespaceError> {
        let index = self.index().await?;
        if index.contains(path.as_str()) {
            return Err(NamespaceError::already_exists(path.to_string()));
        }
        let parent = self.parent_dir(&index, path).await?;

        let entry = Entry::directory(id, parent.id, path.name(), Utc::now());
        let mut entries = index.entries.clone();
        entries.insert(path.to_string(), id.to_owned());
        let next = index.successor(entries);

        self.metadata.commit_entry_and_index(&entry, &next).await?;
        Ok(next.version)
    }

    /// Streams `content` into the file at `path`, creating or replacing it.
    ///
    /// Content is durable before the metadata commit. If the commit fails, the blob of
    /// a new file stays behind unreferenced.
    #[instrument(skip(self, content))]
    pub async fn create_or_update<R>(
        &self,
        path: &str,
        content: R,
    ) -> Result<FileInfo, NamespaceError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = NormalizedPath::try_from(path)?;
        let pending = self.prepare_write(&path, OpenFlags::CREATE_OR_REPLACE).await?;
        let size = self.physical.put_large(&pending.id, content).await?;
        self.commit_write(&pending, size).await
    }

    /// Whole-body variant of [`create_or_update`](Self::create_or_update).
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<FileInfo, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        let pending = self.prepare_write(&path, OpenFlags::CREATE_OR_REPLACE).await?;

        let size = if data.len() < self.small_object_threshold {
            self.physical.put(&pending.id, data).await?;
            data.len() as u64
        } else {
            self.physical.put_large(&pending.id, data).await?
        };
        self.commit_write(&pending, size).await
    }

    /// Opens a streaming write session. The metadata commit happens on
    /// [`WriteHandle::close`].
    ///
    /// # Errors
    /// [`NamespaceError::AlreadyExists`] if the path exists and `flags` do not allow
    /// overwriting, [`NamespaceError::NotFound`] if it is missing without
    /// [`OpenFlags::CREATE`], [`NamespaceError::NotSupported`] for a directory.
    #[instrument(skip(self, _mode))]
    pub async fn open_for_write(
        &self,
        path: &str,
        flags: OpenFlags,
        _mode: u32,
    ) -> Result<WriteHandle<M, P>, NamespaceError> {
        let path = NormalizedPath::try_from(path)?;
        let pending = self.prepare_write(&path, flags).await?;
        Ok(WriteHandle::open(self.clone(), pending))
    }

    /// Opens a write session, or, when `content` is given, writes it whole and returns
    /// an already closed handle carrying the outcome.
    #[instrument(skip(self, mode, content))]
    pub async fn create_or_open_for_write<R>(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
        content: Option<R>,
    ) -> Result<FileHandle<M, P>, NamespaceError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let Some(content) = content else {
            return Ok(FileHandle::Write(self.open_for_write(path, flags, mode).await?));
        };

        let path = NormalizedPath::try_from(path)?;
        let pending = self.prepare_write(&path, flags).await?;
        let size = self.physical.put_large(&pending.id, content).await?;
        let info = self.commit_write(&pending, size).await?;
        Ok(FileHandle::Write(WriteHandle::closed(self.clone(), pending, info)))
    }

    /// Checks `flags` against a fresh index and picks the blob id the content goes to.
    pub(crate) async fn prepare_write(
        &self,
        path: &NormalizedPath,
        flags: OpenFlags,
    ) -> Result<PendingWrite, NamespaceError> {
        let index = self.index().await?;

        if let Some(id) = index.get(path.as_str()) {
            let entry = self.entry(id).await?;
            if entry.is_dir() {
                return Err(NamespaceError::not_supported(format!("{path} is a directory")));
            }
            if !flags.allows_overwrite() {
                return Err(NamespaceError::already_exists(path.to_string()));
            }
            return Ok(PendingWrite { path: path.clone(), id: entry.id, replaces: true });
        }

        if !flags.contains(OpenFlags::CREATE) {
            return Err(NamespaceError::not_found(path.to_string()));
        }
        self.parent_dir(&index, path).await?;
        Ok(PendingWrite { path: path.clone(), id: safe_nanoid!(), replaces: false })
    }

    /// Binds content of `size` bytes, already stored under `pending.id`, to its path.
    pub(crate) async fn commit_write(
        &self,
        pending: &PendingWrite,
        size: u64,
    ) -> Result<FileInfo, NamespaceError> {
        let outcome =
            self.retry.run("commit_write", |_| self.try_commit_write(pending, size)).await;

        match &outcome {
            Ok(_) => debug!(path = %pending.path, id = %pending.id, size, "Content committed"),
            Err(err) if !pending.replaces => warn!(
                path = %pending.path,
                id = %pending.id,
                error = %err,
                "Commit failed, blob orphaned"
            ),
            Err(err) => warn!(
                path = %pending.path,
                id = %pending.id,
                error = %err,
                "Replacement commit failed, blob holds uncommitted content"
            ),
        }
        outcome
    }

    async fn try_commit_write(
        &self,
        pending: &PendingWrite,
        size: u64,
    ) -> Result<FileInfo, NamespaceError> {
        let index = self.index().await?;
        let path = &pending.path;
        let bound = index.get(path.as_str());

        if pending.replaces {
            return match bound {
                Some(id) if id == pending.id => {
                    let mut entry = self.entry(id).await?;
                    entry.size = size;
                    entry.modified = Utc::now();
                    entry.version += 1;
                    self.metadata.commit_entry_and_index(&entry, &index.bumped()).await?;
                    Ok(entry.info())
                },
                Some(_) => Err(NamespaceError::already_exists(format!(
                    "{path} was replaced during the write"
                ))),
                None => {
                    Err(NamespaceError::not_found(format!("{path} was removed during the write")))
                },
            };
        }

        if bound.is_some() {
            return Err(NamespaceError::already_exists(path.to_string()));
        }
        let parent = self.parent_dir(&index, path).await?;

        let entry = Entry::file(pending.id.clone(), parent.id, path.name(), size, Utc::now());
        let mut entries = index.entries.clone();
        entries.insert(path.to_string(), pending.id.clone());
        self.metadata.commit_entry_and_index(&entry, &index.successor(entries)).await?;
        Ok(entry.info())
    }
}
