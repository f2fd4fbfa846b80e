use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{RANGE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// The request headers a download depends on, captured verbatim.
///
/// Works as an axum extractor and never rejects. A non-UTF-8 `User-Agent`
/// is treated as absent; a non-UTF-8 `Range` is kept, lossily decoded, so
/// that it is answered with `416`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    pub range: Option<String>,
    pub user_agent: Option<String>,
}

impl DownloadRequest {
    pub fn new(range: Option<&str>, user_agent: Option<&str>) -> Self {
        DownloadRequest {
            range: range.map(str::to_owned),
            user_agent: user_agent.map(str::to_owned),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        // a present but non-UTF-8 range must still fail parsing, not vanish
        let range = headers
            .get(RANGE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        DownloadRequest { range, user_agent }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for DownloadRequest {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(DownloadRequest::from_headers(&parts.headers))
    }
}
