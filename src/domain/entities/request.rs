//! Outbound request descriptors.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::domain::errors::RequestError;

/// Content type used for form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Content type used for JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Unique identifier assigned by the queue on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw sequence number.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
    /// HEAD.
    Head,
    /// OPTIONS.
    Options,
    /// TRACE.
    Trace,
    /// PATCH.
    Patch,
}

impl Method {
    /// Returns the method token as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority. Higher priorities leave the queue first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Background work.
    Low = 0,
    /// Default priority.
    #[default]
    Normal = 1,
    /// User-visible work.
    High = 2,
    /// Dispatched ahead of everything else.
    Immediate = 3,
}

/// Timeout and retry behavior of a single request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    initial_timeout: Option<Duration>,
    max_retries: u32,
    backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a policy. Each retry grows the timeout by `backoff_multiplier`.
    #[must_use]
    pub const fn new(initial_timeout: Duration, max_retries: u32, backoff_multiplier: f32) -> Self {
        Self {
            initial_timeout: Some(initial_timeout),
            max_retries,
            backoff_multiplier,
        }
    }

    /// Policy that never retries and uses the client-wide timeout.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            initial_timeout: None,
            max_retries: 0,
            backoff_multiplier: 0.0,
        }
    }

    /// Maximum number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Timeout for the given zero-based attempt.
    #[must_use]
    pub fn timeout_for_attempt(&self, attempt: u32) -> Option<Duration> {
        let base = self.initial_timeout?;
        let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
        let factor = (1.0 + f64::from(self.backoff_multiplier.max(0.0))).powi(exponent);
        Some(base.mul_f64(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Key-value form parameters, sent url-encoded.
    Form(Vec<(String, String)>),
    /// Raw bytes with an explicit content type.
    Raw {
        /// Value of the `Content-Type` header.
        content_type: String,
        /// Payload.
        data: Bytes,
    },
}

impl RequestBody {
    /// Returns the content type sent with this body.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Form(_) => FORM_CONTENT_TYPE,
            Self::Raw { content_type, .. } => content_type,
        }
    }
}

/// A single outbound HTTP call descriptor.
///
/// Built once with the consuming setters below, then handed to the queue,
/// which owns it until delivery or cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
    priority: Priority,
    tag: Option<String>,
    retry_policy: RetryPolicy,
}

impl Request {
    /// Creates a request with the given method.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            priority: Priority::default(),
            tag: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Sets a header, replacing any previous value of the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            slot.1 = value;
        } else {
            self.headers.push((name, value));
        }
        self
    }

    /// Sets a form parameter. Putting an existing key again replaces its value.
    ///
    /// Any raw body set earlier is discarded.
    #[must_use]
    pub fn with_form_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if !matches!(self.body, Some(RequestBody::Form(_))) {
            self.body = Some(RequestBody::Form(Vec::new()));
        }
        if let Some(RequestBody::Form(params)) = &mut self.body {
            if let Some(slot) = params.iter_mut().find(|(existing, _)| *existing == key) {
                slot.1 = value;
            } else {
                params.push((key, value));
            }
        }
        self
    }

    /// Sets a raw body.
    #[must_use]
    pub fn with_body(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the value cannot be serialized.
    pub fn with_json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, RequestError> {
        let data = serde_json::to_vec(value)
            .map_err(|e| RequestError::invalid_with(format!("cannot serialize JSON body: {e}"), e))?;
        Ok(self.with_body(JSON_CONTENT_TYPE, data))
    }

    /// Sets the dispatch priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Tags the request so a group can be cancelled together.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the timeout and retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the URL as given.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the custom headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Returns the dispatch priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the cancellation tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the timeout and retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Parses and validates the URL.
    ///
    /// # Errors
    /// Returns `InvalidRequest` unless the URL is an absolute http(s) URL with a host.
    pub fn parsed_url(&self) -> Result<reqwest::Url, RequestError> {
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| RequestError::invalid_with(format!("malformed URL {:?}: {e}", self.url), e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestError::invalid(format!(
                "unsupported URL scheme {:?}",
                url.scheme()
            )));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(RequestError::invalid(format!("URL {:?} has no host", self.url)));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use test_case::test_case;

    #[test]
    fn test_form_param_last_value_wins() {
        let request = Request::post("https://example.com")
            .with_form_param("param1", "value1")
            .with_form_param("param2", "value2")
            .with_form_param("param2", "value3");

        let Some(RequestBody::Form(params)) = request.body() else {
            panic!("expected form body");
        };
        assert_eq!(
            params,
            &vec![
                ("param1".to_string(), "value1".to_string()),
                ("param2".to_string(), "value3".to_string()),
            ]
        );
        assert_eq!(
            request.body().map(RequestBody::content_type),
            Some(FORM_CONTENT_TYPE)
        );
    }

    #[test]
    fn test_header_replaced_case_insensitively() {
        let request = Request::get("https://example.com")
            .with_header("Accept", "text/plain")
            .with_header("accept", "application/json");

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers()[0].1, "application/json");
    }

    #[test]
    fn test_builder_defaults() {
        let request = Request::get("https://example.com");
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.priority(), Priority::Normal);
        assert_eq!(request.tag(), None);
        assert_eq!(request.retry_policy().max_retries(), 0);
        assert!(request.body().is_none());
    }

    #[test]
    fn test_json_body() -> Result<(), RequestError> {
        let request = Request::post("https://example.com").with_json_body(&serde_json::json!({"a": 1}))?;
        let Some(RequestBody::Raw { content_type, data }) = request.body() else {
            panic!("expected raw body");
        };
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(data.as_ref(), br#"{"a":1}"#);
        Ok(())
    }

    #[test_case("https://www.example.com/path" ; "https")]
    #[test_case("http://127.0.0.1:8080/x?y=1" ; "http with port")]
    fn test_valid_urls(url: &str) {
        assert!(Request::get(url).parsed_url().is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("not a url" ; "no scheme")]
    #[test_case("ftp://example.com/file" ; "unsupported scheme")]
    #[test_case("http://" ; "missing host")]
    fn test_invalid_urls(url: &str) {
        let err = Request::get(url).parsed_url().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Immediate > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn test_retry_timeout_backoff() {
        let policy = RetryPolicy::new(Duration::from_millis(1000), 2, 1.0);
        assert_eq!(policy.timeout_for_attempt(0), Some(Duration::from_millis(1000)));
        assert_eq!(policy.timeout_for_attempt(1), Some(Duration::from_millis(2000)));
        assert_eq!(policy.timeout_for_attempt(2), Some(Duration::from_millis(4000)));
        assert_eq!(RetryPolicy::none().timeout_for_attempt(3), None);
    }
}
