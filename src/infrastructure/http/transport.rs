//! reqwest-backed transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, warn};

use crate::domain::entities::{FORM_CONTENT_TYPE, Method, RawResponse, Request, RequestBody};
use crate::domain::errors::RequestError;
use crate::domain::ports::TransportPort;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("volea/", env!("CARGO_PKG_VERSION"));

/// Client-wide timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport built on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default user agent and timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self, RequestError> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom user agent and client-wide timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self, RequestError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RequestError::invalid_with(format!("failed to create HTTP client: {e}"), e)
            })?;

        Ok(Self { client })
    }

    fn build(
        &self,
        request: &Request,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Request, RequestError> {
        let url = request.parsed_url()?;
        let mut builder = self.client.request(to_reqwest_method(request.method()), url);

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let is_form = match request.body() {
            Some(RequestBody::Form(params)) => {
                builder = builder.form(params);
                true
            }
            Some(RequestBody::Raw { content_type, data }) => {
                builder = builder
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(data.clone());
                false
            }
            None => false,
        };

        let mut built = builder
            .build()
            .map_err(|e| RequestError::invalid_with(format!("cannot build request: {e}"), e))?;

        if is_form {
            built
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }

        Ok(built)
    }
}

const fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Trace => reqwest::Method::TRACE,
        Method::Patch => reqwest::Method::PATCH,
    }
}

fn network_error(error: reqwest::Error, url: &str) -> RequestError {
    if error.is_builder() {
        return RequestError::invalid_with(format!("cannot build request: {error}"), error);
    }

    warn!(url = %url, error = %error, "Request failed");
    let timed_out = error.is_timeout();
    let message = if timed_out {
        "request timed out"
    } else if error.is_connect() {
        "failed to connect"
    } else {
        "request failed"
    };
    RequestError::network_with(format!("{message}: {url}"), timed_out, error)
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn execute(
        &self,
        request: &Request,
        timeout: Option<Duration>,
    ) -> Result<RawResponse, RequestError> {
        let built = self.build(request, timeout)?;
        let started = Instant::now();

        debug!(method = %request.method(), url = %request.url(), "Executing request");

        let response = self
            .client
            .execute(built)
            .await
            .map_err(|e| network_error(e, request.url()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(e, request.url()))?;
        let elapsed = started.elapsed();

        debug!(
            url = %request.url(),
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = elapsed.as_millis(),
            "Response received"
        );

        if !status.is_success() {
            return Err(RequestError::http_status(status.as_u16(), body));
        }

        Ok(RawResponse::new(status.as_u16(), headers, body).with_elapsed(elapsed))
    }
}
