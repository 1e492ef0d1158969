use crate::path::NormalizedPath;
use loft_domain::FileInfo;
use loft_storage::PhysicalStore;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

/// Streaming reader over a committed blob.
#[derive(Debug)]
pub struct ReadHandle<P: PhysicalStore> {
    path: NormalizedPath,
    info: FileInfo,
    reader: P::Reader,
}

impl<P: PhysicalStore> ReadHandle<P> {
    pub(crate) const fn new(path: NormalizedPath, info: FileInfo, reader: P::Reader) -> Self {
        Self { path, info, reader }
    }

    #[must_use]
    pub const fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// File info as of open time.
    #[must_use]
    pub const fn stat(&self) -> &FileInfo {
        &self.info
    }

    #[must_use]
    pub fn close(self) -> FileInfo {
        self.info
    }
}

impl<P: PhysicalStore> AsyncRead for ReadHandle<P> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl<P: PhysicalStore> AsyncSeek for ReadHandle<P> {
    fn start_seek(self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().reader).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().reader).poll_complete(cx)
    }
}
