use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::ContentRange;
use axum_extra::TypedHeader;
use thiserror::Error;

use crate::range::RangeError;

/// Failures that prevent a download response from being assembled.
///
/// Each variant maps to a bodyless HTTP error response via [`IntoResponse`].
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The identifier does not resolve to a readable regular file.
    #[error("resource {identifier:?} not found")]
    NotFound { identifier: String },

    /// The `Range` header is present but unparsable or out of bounds.
    #[error("range {header:?} not satisfiable for {total} bytes: {source}")]
    MalformedRange {
        header: String,
        total: u64,
        #[source]
        source: RangeError,
    },

    /// Opening or measuring the resource failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    pub fn status(&self) -> StatusCode {
        match self {
            DownloadError::NotFound { .. } => StatusCode::NOT_FOUND,
            DownloadError::MalformedRange { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            DownloadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            DownloadError::MalformedRange { total, .. } => {
                let header = TypedHeader(ContentRange::unsatisfied_bytes(total));
                (status, header, ()).into_response()
            }
            DownloadError::NotFound { .. } => status.into_response(),
            DownloadError::Io(err) => {
                tracing::error!(error = %err, "failed to open download");
                status.into_response()
            }
        }
    }
}
