//! Port definition for the network transport.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::{RawResponse, Request};
use crate::domain::errors::RequestError;

/// Performs one network round trip for a request.
///
/// Implementations must reject malformed requests with `InvalidRequest`
/// before any I/O, report connectivity failures as `Network` and non-success
/// statuses as `HttpStatus` carrying the raw body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Executes the request. `timeout` overrides the client-wide timeout.
    async fn execute(
        &self,
        request: &Request,
        timeout: Option<Duration>,
    ) -> Result<RawResponse, RequestError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use parking_lot::Mutex;
    use reqwest::header::HeaderMap;
    use tokio::sync::Notify;

    /// Scripted transport for queue tests.
    ///
    /// Serves canned bodies by URL, records the order in which URLs were
    /// executed and can hold every call at a gate until it is opened.
    #[derive(Default)]
    pub struct ScriptedTransport {
        routes: Mutex<HashMap<String, Result<Bytes, RequestError>>>,
        executed: Mutex<Vec<String>>,
        calls: AtomicUsize,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    impl ScriptedTransport {
        /// Creates a transport with no routes.
        pub fn new() -> Self {
            Self::default()
        }

        /// Serves `body` with status 200 for `url`.
        pub fn route(&self, url: &str, body: impl Into<Bytes>) {
            self.routes.lock().insert(url.to_string(), Ok(body.into()));
        }

        /// Fails every call for `url` with `error`.
        pub fn fail(&self, url: &str, error: RequestError) {
            self.routes.lock().insert(url.to_string(), Err(error));
        }

        /// Holds calls until the returned gate is notified.
        pub fn close_gate(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.gate.lock() = Some(gate.clone());
            gate
        }

        /// Lets held and future calls through.
        pub fn open_gate(&self) {
            if let Some(gate) = self.gate.lock().take() {
                gate.notify_waiters();
            }
        }

        /// URLs in execution order.
        pub fn executed(&self) -> Vec<String> {
            self.executed.lock().clone()
        }

        /// Number of calls made.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransportPort for ScriptedTransport {
        async fn execute(
            &self,
            request: &Request,
            _timeout: Option<Duration>,
        ) -> Result<RawResponse, RequestError> {
            request.parsed_url()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.executed.lock().push(request.url().to_string());

            let gate = self.gate.lock().clone();
            if let Some(gate) = gate {
                let notified = gate.notified();
                if self.gate.lock().is_some() {
                    notified.await;
                }
            }

            let route = self.routes.lock().get(request.url()).cloned();
            match route {
                Some(Ok(body)) => Ok(RawResponse::new(200, HeaderMap::new(), body)),
                Some(Err(error)) => Err(error),
                None => Err(RequestError::http_status(404, Bytes::new())),
            }
        }
    }
}
