use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, ReadBuf};

use crate::{AsyncSeekStart, RangeBody};

/// A downloadable resource: a seekable reader with a fixed byte size and
/// the file name offered to the client.
///
/// The reader is owned, so it is closed as soon as the resource, or the
/// response stream it moves into, is dropped.
#[pin_project]
pub struct FileResource<B: AsyncRead + AsyncSeekStart> {
    byte_size: u64,
    filename: String,
    #[pin]
    body: B,
}

impl<B: AsyncRead + AsyncSeekStart> std::fmt::Debug for FileResource<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileResource")
            .field("byte_size", &self.byte_size)
            .field("filename", &self.filename)
            .finish()
    }
}

impl FileResource<tokio::fs::File> {
    /// Opens `path`, naming the download after its last path component.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<FileResource<tokio::fs::File>> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::open_as(path, filename).await
    }

    /// Opens `path`, offering it to the client as `filename`.
    ///
    /// Calls [`tokio::fs::File::metadata`] to determine file size.
    pub async fn open_as(
        path: impl AsRef<Path>,
        filename: impl Into<String>,
    ) -> io::Result<FileResource<tokio::fs::File>> {
        let file = tokio::fs::File::open(path).await?;
        let byte_size = file.metadata().await?.len();
        Ok(FileResource { byte_size, filename: filename.into(), body: file })
    }
}

impl<B: AsyncRead + AsyncSeekStart> FileResource<B> {
    /// Wraps `body` with a byte size supplied manually.
    pub fn sized(body: B, byte_size: u64, filename: impl Into<String>) -> Self {
        FileResource { byte_size, filename: filename.into(), body }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Replaces the name offered to the client.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

impl<B: AsyncRead + AsyncSeek + Unpin> FileResource<B> {
    /// Determines the size by seeking to the end, then rewinds to the start.
    pub async fn seek(mut body: B, filename: impl Into<String>) -> io::Result<FileResource<B>> {
        let byte_size = body.seek(io::SeekFrom::End(0)).await?;
        body.seek(io::SeekFrom::Start(0)).await?;
        Ok(FileResource { byte_size, filename: filename.into(), body })
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncRead for FileResource<B> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().body.poll_read(cx, buf)
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncSeekStart for FileResource<B> {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        self.project().body.start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().body.poll_complete(cx)
    }
}

impl<B: AsyncRead + AsyncSeekStart> RangeBody for FileResource<B> {
    fn byte_size(&self) -> u64 {
        self.byte_size
    }
}
