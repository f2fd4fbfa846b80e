//! `Content-Disposition` values carrying non-ASCII file names.
//!
//! Old clients only read `filename`, newer ones prefer the RFC 5987
//! `filename*` parameter. Both carry the same percent-encoded name so the
//! header value stays plain visible ASCII.

use std::borrow::Cow;
use std::fmt;

use axum::http::HeaderValue;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// Everything except the URI unreserved set `ALPHA / DIGIT / "-" / "." / "_" / "~"`.
const FILENAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// How the client should present the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispositionType {
    #[default]
    Attachment,
    Inline,
}

impl fmt::Display for DispositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispositionType::Attachment => f.write_str("attachment"),
            DispositionType::Inline => f.write_str("inline"),
        }
    }
}

/// Percent-encodes `name` as UTF-8, escaping every octet outside the unreserved set.
pub fn encode_filename(name: &str) -> String {
    utf8_percent_encode(name, FILENAME).to_string()
}

/// Reverses [`encode_filename`]. Returns `None` if the octets are not UTF-8.
pub fn decode_filename(encoded: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(encoded).decode_utf8().ok()
}

/// Builds `<type>;filename="<enc>";filename*=utf-8''<enc>`.
pub fn content_disposition(kind: DispositionType, name: &str) -> HeaderValue {
    let encoded = encode_filename(name);
    let value = format!("{kind};filename=\"{encoded}\";filename*=utf-8''{encoded}");
    // the encoded name is unreserved ASCII and '%', always a valid header value
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
