//! HTTP transport adapter.

pub mod transport;

#[cfg(test)]
pub(crate) mod test_server;

pub use transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ReqwestTransport};
