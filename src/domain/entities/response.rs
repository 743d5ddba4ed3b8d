//! Raw and parsed responses.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use super::cache_metadata::CacheMetadata;
use crate::domain::errors::RequestError;

/// Charset assumed for text bodies without a declared charset.
pub const DEFAULT_TEXT_CHARSET: &str = "ISO-8859-1";

/// Charset assumed for JSON and XML bodies without a declared charset.
pub const DEFAULT_PROTOCOL_CHARSET: &str = "utf-8";

/// Bytes, headers and status of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
}

impl RawResponse {
    /// Creates a raw response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Sets the round-trip time.
    #[must_use]
    pub const fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body bytes.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the round-trip time.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the declared charset, or `default` when none is declared.
    #[must_use]
    pub fn charset<'a>(&'a self, default: &'a str) -> &'a str {
        self.content_type()
            .and_then(|content_type| {
                content_type.split(';').skip(1).find_map(|param| {
                    let (name, value) = param.split_once('=')?;
                    name.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| value.trim().trim_matches('"'))
                })
            })
            .filter(|charset| !charset.is_empty())
            .unwrap_or(default)
    }

    /// Decodes the body using the declared charset, falling back to `default`.
    ///
    /// # Errors
    /// Returns `ParseError` if the charset is not supported.
    pub fn text(&self, default: &str) -> Result<String, RequestError> {
        decode_text(&self.body, self.charset(default))
    }
}

/// Decodes bytes in one of the supported charsets.
///
/// Malformed sequences are replaced with U+FFFD rather than rejected.
///
/// # Errors
/// Returns `ParseError` for charsets other than UTF-8, ISO-8859-1 and US-ASCII.
pub fn decode_text(bytes: &[u8], charset: &str) -> Result<String, RequestError> {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => {
            Ok(bytes.iter().copied().map(char::from).collect())
        }
        "us-ascii" | "ascii" => Ok(bytes
            .iter()
            .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
            .collect()),
        other => Err(RequestError::parse(format!("unsupported charset {other:?}"))),
    }
}

/// Successful, parsed result of a request.
#[derive(Debug, Clone)]
pub struct Response<T> {
    value: T,
    cache: Option<CacheMetadata>,
}

impl<T> Response<T> {
    /// Creates a response.
    #[must_use]
    pub const fn new(value: T, cache: Option<CacheMetadata>) -> Self {
        Self { value, cache }
    }

    /// Returns the parsed value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the response and returns the parsed value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns cache metadata derived from the response headers.
    ///
    /// `None` when the server forbade caching or sent no caching headers.
    #[must_use]
    pub const fn cache(&self) -> Option<&CacheMetadata> {
        self.cache.as_ref()
    }

    /// Maps the parsed value, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            value: f(self.value),
            cache: self.cache,
        }
    }
}

/// The single terminal outcome delivered for a request.
pub type Delivery<T> = Result<Response<T>, RequestError>;
