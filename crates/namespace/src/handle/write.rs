use crate::engine::{NamespaceEngine, PendingWrite};
use crate::error::NamespaceError;
use crate::path::NormalizedPath;
use loft_domain::FileInfo;
use loft_metadata::MetadataStore;
use loft_storage::{PhysicalStore, StorageError};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffer between the writer and the upload task. Writes wait once it is full.
const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
struct Upload {
    pipe: DuplexStream,
    task: JoinHandle<Result<u64, StorageError>>,
}

/// A write session streaming into the physical store.
///
/// Bytes flow through a bounded pipe into `put_large` as they are written. `close`
/// waits for the upload and commits the metadata; its outcome is cached and
/// returned again by later calls. Dropping an open handle abandons the upload
/// without touching the index.
#[derive(Debug)]
pub struct WriteHandle<M: MetadataStore, P: PhysicalStore> {
    engine: NamespaceEngine<M, P>,
    pending: PendingWrite,
    upload: Option<Upload>,
    outcome: Option<Result<FileInfo, NamespaceError>>,
    written: u64,
}

impl<M: MetadataStore, P: PhysicalStore> WriteHandle<M, P> {
    pub(crate) fn open(engine: NamespaceEngine<M, P>, pending: PendingWrite) -> Self {
        let (pipe, source) = tokio::io::duplex(PIPE_CAPACITY);
        let uploader = engine.clone();
        let id = pending.id.clone();
        let task = tokio::spawn(async move { uploader.physical().put_large(&id, source).await });

        debug!(path = %pending.path, id = %pending.id, "Write session opened");
        Self { engine, pending, upload: Some(Upload { pipe, task }), outcome: None, written: 0 }
    }

    /// A handle whose content was written and committed up front.
    pub(crate) fn closed(
        engine: NamespaceEngine<M, P>,
        pending: PendingWrite,
        info: FileInfo,
    ) -> Self {
        let written = info.size;
        Self { engine, pending, upload: None, outcome: Some(Ok(info)), written }
    }

    #[must_use]
    pub const fn path(&self) -> &NormalizedPath {
        &self.pending.path
    }

    /// Bytes accepted so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Appends `buf` to the content. Waits while the upload is behind.
    ///
    /// # Errors
    /// [`NamespaceError::NotSupported`] after `close`, or the upload failure that
    /// stopped the pipe.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, NamespaceError> {
        let Some(upload) = self.upload.as_mut() else {
            return Err(NamespaceError::not_supported(format!("{} is closed", self.pending.path)));
        };

        if let Err(err) = upload.pipe.write_all(buf).await {
            return Err(self.abandon(&err).await);
        }
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    /// Finishes the upload and commits the metadata.
    ///
    /// # Errors
    /// The upload failure, or the commit failure once retries are spent.
    pub async fn close(&mut self) -> Result<FileInfo, NamespaceError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let Some(upload) = self.upload.take() else {
            return Err(NamespaceError::from("Write handle has neither an upload nor an outcome"));
        };

        let outcome = self.finish(upload).await;
        self.outcome = Some(outcome.clone());
        outcome
    }

    async fn finish(&self, upload: Upload) -> Result<FileInfo, NamespaceError> {
        let Upload { mut pipe, task } = upload;
        if let Err(err) = pipe.shutdown().await {
            debug!(path = %self.pending.path, error = %err, "Pipe shutdown failed");
        }
        drop(pipe);

        let size = join(task).await?;
        if size != self.written {
            warn!(path = %self.pending.path, size, written = self.written, "Upload size mismatch");
        }
        self.engine.commit_write(&self.pending, size).await
    }

    /// The pipe broke, so the upload task has ended. Its result explains why.
    async fn abandon(&mut self, err: &std::io::Error) -> NamespaceError {
        let cause = match self.upload.take() {
            Some(Upload { task, .. }) => match join(task).await {
                Err(cause) => cause,
                Ok(_) => NamespaceError::unavailable(format!("Upload ended early: {err}")),
            },
            None => NamespaceError::unavailable(err.to_string()),
        };
        warn!(path = %self.pending.path, error = %cause, "Write session failed");
        self.outcome = Some(Err(cause.clone()));
        cause
    }
}

async fn join(task: JoinHandle<Result<u64, StorageError>>) -> Result<u64, NamespaceError> {
    match task.await {
        Ok(result) => Ok(result?),
        Err(err) => Err(NamespaceError::from(format!("Upload task failed: {err}"))),
    }
}

impl<M: MetadataStore, P: PhysicalStore> Drop for WriteHandle<M, P> {
    fn drop(&mut self) {
        if let Some(upload) = self.upload.take() {
            upload.task.abort();
            warn!(
                path = %self.pending.path,
                id = %self.pending.id,
                "Write session dropped before close"
            );
        }
    }
}
