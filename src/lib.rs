//! # axum-download
//!
//! Resumable file downloads for [`axum`][1].
//!
//! A [`Download`] combines a [`FileResource`] with the request's `Range` and
//! `User-Agent` headers and responds with either the whole resource or a
//! single contiguous byte range of it. Responses always carry an
//! `application/octet-stream` content type and a `Content-Disposition`
//! header with both a plain and an RFC 5987 encoded file name.
//!
//! Any type implementing both [`AsyncRead`] and [`AsyncSeekStart`] can be
//! downloaded. [`AsyncSeekStart`] is a trait defined by this crate which only
//! allows seeking from the start of a file. It is automatically implemented
//! for any type implementing [`AsyncSeek`].
//!
//! ```
//! use axum::Router;
//! use axum::extract::{Path, State};
//! use axum::routing::get;
//!
//! use axum_download::{Download, DownloadError, DownloadRequest, FsLocator};
//!
//! async fn download(
//!     State(locator): State<FsLocator>,
//!     Path(path): Path<String>,
//!     request: DownloadRequest,
//! ) -> Result<Download<tokio::fs::File>, DownloadError> {
//!     Download::locate(&locator, &path, request).await
//! }
//!
//! let _app: Router = Router::new()
//!     .route("/download/{*path}", get(download))
//!     .with_state(FsLocator::new("."));
//! ```
//!
//! [1]: https://docs.rs/axum

mod agent;
mod config;
mod disposition;
mod error;
mod file;
mod locate;
mod range;
mod request;
mod stream;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::header::CONTENT_DISPOSITION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentLength, ContentRange, ContentType};
use axum_extra::TypedHeader;
use tokio::io::{AsyncRead, AsyncSeek};

pub use agent::{classify, full_content_status, ClientFamily};
pub use config::{ConfigError, DownloadConfig};
pub use disposition::{content_disposition, decode_filename, encode_filename, DispositionType};
pub use error::DownloadError;
pub use file::FileResource;
pub use locate::{FsLocator, Locate, MemoryLocator};
pub use range::{parse_range, ByteRange, RangeError, RangeSpec};
pub use request::DownloadRequest;
pub use stream::RangedStream;

/// [`AsyncSeek`] narrowed to only allow seeking from start.
pub trait AsyncSeekStart {
    /// Same semantics as [`AsyncSeek::start_seek`], always passing position as the `SeekFrom::Start` variant.
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    /// Same semantics as [`AsyncSeek::poll_complete`], returning `()` instead of the new stream position.
    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsyncSeek> AsyncSeekStart for T {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        AsyncSeek::start_seek(self, io::SeekFrom::Start(position))
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncSeek::poll_complete(self, cx).map_ok(|_| ())
    }
}

/// An [`AsyncRead`] and [`AsyncSeekStart`] with a fixed known byte size.
pub trait RangeBody: AsyncRead + AsyncSeekStart {
    /// The total size of the underlying resource.
    ///
    /// This must not change while a response is being assembled or streamed.
    fn byte_size(&self) -> u64;
}

/// The main responder type. Implements [`IntoResponse`].
#[derive(Debug)]
pub struct Download<B: AsyncRead + AsyncSeekStart + Send + 'static> {
    request: DownloadRequest,
    resource: FileResource<B>,
    disposition: DispositionType,
    buffer_size: usize,
}

impl<B: AsyncRead + AsyncSeekStart + Send + 'static> Download<B> {
    /// Construct a download of `resource` answering `request`.
    pub fn new(request: DownloadRequest, resource: FileResource<B>) -> Self {
        Download {
            request,
            resource,
            disposition: DispositionType::Attachment,
            buffer_size: stream::DEFAULT_BUFFER_SIZE,
        }
    }

    /// Resolves `identifier` through `locator` and wraps the result.
    pub async fn locate<L>(
        locator: &L,
        identifier: &str,
        request: DownloadRequest,
    ) -> Result<Self, DownloadError>
    where
        L: Locate<Reader = B>,
    {
        let resource = locator.resolve(identifier).await?;
        Ok(Download::new(request, resource))
    }

    /// Applies the disposition type and stream buffer size from `config`.
    pub fn with_config(self, config: &DownloadConfig) -> Self {
        self.disposition(config.disposition).buffer_size(config.io_buffer_size)
    }

    pub fn disposition(mut self, disposition: DispositionType) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Responds to the request, returning headers and body as
    /// [`DownloadResponse`]. Fails with [`DownloadError::MalformedRange`]
    /// if the `Range` header cannot be satisfied.
    pub fn try_respond(self) -> Result<DownloadResponse<B>, DownloadError> {
        let total = self.resource.byte_size();
        let range_header = self.request.range.as_deref();

        let spec = parse_range(range_header, total).map_err(|source| {
            tracing::warn!(range = ?range_header, total, %source, "unsatisfiable range");
            DownloadError::MalformedRange {
                header: range_header.unwrap_or_default().to_string(),
                total,
                source,
            }
        })?;

        let status = if spec.partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            full_content_status(classify(self.request.user_agent.as_deref()))
        };

        // a partial range is never empty, so `last` is always known here
        let content_range = match (spec.partial, spec.range.last()) {
            (true, Some(last)) => ContentRange::bytes(spec.range.start..=last, total).ok(),
            _ => None,
        };

        let content_disposition = content_disposition(self.disposition, self.resource.filename());

        tracing::debug!(
            status = status.as_u16(),
            start = spec.range.start,
            length = spec.range.length,
            total,
            filename = self.resource.filename(),
            "assembled download response"
        );

        let range = spec.range;
        let stream = RangedStream::new(self.resource, range, self.buffer_size);
        Ok(DownloadResponse { status, range, total, content_range, content_disposition, stream })
    }
}

impl<B: AsyncRead + AsyncSeekStart + Send + 'static> IntoResponse for Download<B> {
    fn into_response(self) -> Response {
        self.try_respond().into_response()
    }
}

/// Computed status, headers and body of a download. Implements [`IntoResponse`].
#[derive(Debug)]
pub struct DownloadResponse<B: AsyncRead + AsyncSeekStart> {
    pub status: StatusCode,
    /// The window of the resource the body streams.
    pub range: ByteRange,
    /// Size of the whole resource.
    pub total: u64,
    /// Present only for `206 Partial Content`.
    pub content_range: Option<ContentRange>,
    pub content_disposition: HeaderValue,
    pub stream: RangedStream<FileResource<B>>,
}

impl<B: AsyncRead + AsyncSeekStart + Send + 'static> IntoResponse for DownloadResponse<B> {
    fn into_response(self) -> Response {
        (
            self.status,
            TypedHeader(ContentType::octet_stream()),
            TypedHeader(ContentLength(self.range.length)),
            TypedHeader(AcceptRanges::bytes()),
            self.content_range.map(TypedHeader),
            [(CONTENT_DISPOSITION, self.content_disposition)],
            self.stream,
        )
            .into_response()
    }
}
