use std::{io, mem};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tokio::io::ReadBuf;

use crate::range::ByteRange;
use crate::RangeBody;

pub(crate) const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Response body stream yielding exactly `range.length` bytes from
/// `range.start`. Implements [`Stream`], [`Body`], and [`IntoResponse`].
///
/// Owns the resource; dropping the stream, for instance when the client
/// disconnects, releases it.
#[pin_project]
pub struct RangedStream<B> {
    state: StreamState,
    length: u64,
    buffer_size: usize,
    #[pin]
    body: B,
}

impl<B> std::fmt::Debug for RangedStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedStream")
            .field("state", &self.state)
            .field("length", &self.length)
            .finish()
    }
}

impl<B: RangeBody + Send + 'static> RangedStream<B> {
    pub(crate) fn new(body: B, range: ByteRange, buffer_size: usize) -> Self {
        RangedStream {
            state: StreamState::Seek { start: range.start },
            length: range.length,
            buffer_size: buffer_size.max(1),
            body,
        }
    }
}

#[derive(Debug)]
enum StreamState {
    Seek { start: u64 },
    Seeking { remaining: u64 },
    Reading { buffer: BytesMut, remaining: u64 },
    Done,
}

impl<B: RangeBody + Send + 'static> IntoResponse for RangedStream<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: RangeBody> Body for RangedStream<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<io::Result<Frame<Bytes>>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeBody> Stream for RangedStream<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>
    ) -> Poll<Option<io::Result<Bytes>>> {
        let mut this = self.project();

        if let StreamState::Seek { start } = *this.state {
            if *this.length == 0 {
                *this.state = StreamState::Done;
                return Poll::Ready(None);
            }
            match this.body.as_mut().start_seek(start) {
                Err(e) => { return Poll::Ready(Some(Err(fail(this.state, e)))); }
                Ok(()) => {
                    let remaining = *this.length;
                    *this.state = StreamState::Seeking { remaining };
                }
            }
        }

        if let StreamState::Seeking { remaining } = *this.state {
            match this.body.as_mut().poll_complete(cx) {
                Poll::Pending => { return Poll::Pending; }
                Poll::Ready(Err(e)) => { return Poll::Ready(Some(Err(fail(this.state, e)))); }
                Poll::Ready(Ok(())) => {
                    let buffer = BytesMut::with_capacity(*this.buffer_size);
                    *this.state = StreamState::Reading { buffer, remaining };
                }
            }
        }

        let StreamState::Reading { buffer, remaining } = this.state else {
            return Poll::Ready(None);
        };

        if *remaining == 0 {
            *this.state = StreamState::Done;
            return Poll::Ready(None);
        }

        // never read past the end of the requested window
        let uninit = buffer.spare_capacity_mut();
        let nbytes = std::cmp::min(
            uninit.len(),
            usize::try_from(*remaining).unwrap_or(usize::MAX),
        );
        let mut read_buf = ReadBuf::uninit(&mut uninit[0..nbytes]);

        match this.body.as_mut().poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(fail(this.state, e)))),
            Poll::Ready(Ok(())) => match read_buf.filled().len() {
                0 => {
                    // headers already promised `length` bytes
                    let e = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("resource ended with {remaining} bytes left to send"),
                    );
                    Poll::Ready(Some(Err(fail(this.state, e))))
                }
                n => {
                    // SAFETY: poll_read has initialized the first `n` bytes
                    // of the spare capacity, and `buffer.len()` is 0 here
                    unsafe { buffer.set_len(buffer.len() + n); }

                    let capacity = *this.buffer_size;
                    let chunk = mem::replace(buffer, BytesMut::with_capacity(capacity));

                    // n <= remaining because of the min above
                    *remaining -= n as u64;

                    Poll::Ready(Some(Ok(chunk.freeze())))
                }
            },
        }
    }
}

fn fail(state: &mut StreamState, error: io::Error) -> io::Error {
    tracing::error!(%error, "download stream aborted");
    *state = StreamState::Done;
    error
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use bytes::Bytes;
    use futures::{pin_mut, Stream, StreamExt};
    use tokio::io::{AsyncRead, ReadBuf};

    use super::RangedStream;
    use crate::range::ByteRange;
    use crate::FileResource;

    async fn collect_stream(stream: impl Stream<Item = io::Result<Bytes>>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    fn digits() -> FileResource<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 10) as u8 + b'0').collect();
        FileResource::sized(Cursor::new(data), 1000, "digits.txt")
    }

    #[tokio::test]
    async fn test_streams_exact_window() {
        let stream = RangedStream::new(digits(), ByteRange::new(500, 200), 64);
        let bytes = collect_stream(stream).await.unwrap();
        assert_eq!(200, bytes.len());
        assert_eq!(b"0123456789", &bytes[..10]);
    }

    #[tokio::test]
    async fn test_small_buffer_chunks() {
        let stream = RangedStream::new(digits(), ByteRange::new(3, 10), 4);
        pin_mut!(stream);
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next().await {
            sizes.push(chunk.unwrap().len());
        }
        assert_eq!(vec![4, 4, 2], sizes);
    }

    #[tokio::test]
    async fn test_empty_window() {
        let stream = RangedStream::new(digits(), ByteRange::new(0, 0), 64);
        assert!(collect_stream(stream).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fixture_file() {
        let body = FileResource::open("test/fixture.txt").await.unwrap();
        let stream = RangedStream::new(body, ByteRange::new(0, 30), 64);
        let bytes = collect_stream(stream).await.unwrap();
        assert_eq!(b"Hello world this is a file to ".to_vec(), bytes);
    }

    #[tokio::test]
    async fn test_short_resource_is_an_error() {
        // claims 20 bytes but only holds 10
        let body = FileResource::sized(Cursor::new(b"0123456789".to_vec()), 20, "short");
        let stream = RangedStream::new(body, ByteRange::full(20), 64);
        let err = collect_stream(stream).await.unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "disk went away")))
        }
    }

    impl tokio::io::AsyncSeek for FailingReader {
        fn start_seek(self: Pin<&mut Self>, _: io::SeekFrom) -> io::Result<()> {
            Ok(())
        }

        fn poll_complete(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Poll::Ready(Ok(0))
        }
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let body = FileResource::sized(FailingReader, 10, "broken");
        let stream = RangedStream::new(body, ByteRange::full(10), 64);
        pin_mut!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(io::ErrorKind::BrokenPipe, first.unwrap_err().kind());
        assert!(stream.next().await.is_none());
    }

    struct TrackedReader {
        inner: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    impl AsyncRead for TrackedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl tokio::io::AsyncSeek for TrackedReader {
        fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
            tokio::io::AsyncSeek::start_seek(Pin::new(&mut self.inner), position)
        }

        fn poll_complete(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<io::Result<u64>> {
            tokio::io::AsyncSeek::poll_complete(Pin::new(&mut self.inner), cx)
        }
    }

    #[tokio::test]
    async fn test_resource_released_when_abandoned() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = TrackedReader {
            inner: Cursor::new(vec![7u8; 1000]),
            dropped: dropped.clone(),
        };
        let body = FileResource::sized(reader, 1000, "tracked.bin");

        // client goes away after the first chunk
        let mut stream = RangedStream::new(body, ByteRange::full(1000), 16);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(16, first.len());
        assert!(!dropped.load(Ordering::SeqCst));

        drop(stream);
        assert!(dropped.load(Ordering::SeqCst));
    }
}
