//! Process-wide client objects, created once and passed explicitly.

use std::sync::Arc;

use tracing::info;

use super::config::AppConfig;
use super::http::ReqwestTransport;
use super::image::{BitmapLruCache, ImageLoader};
use super::queue::RequestQueue;
use crate::domain::errors::RequestError;
use crate::domain::ports::{ImageCachePort, TransportPort};

/// Owns the request queue, bitmap cache and image loader.
#[derive(Debug)]
pub struct ClientContext {
    queue: Arc<RequestQueue>,
    image_cache: Arc<BitmapLruCache>,
    image_loader: ImageLoader,
}

impl ClientContext {
    /// Builds a context backed by the reqwest transport.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &AppConfig) -> Result<Self, RequestError> {
        let transport =
            ReqwestTransport::with_options(&config.queue.user_agent, config.queue.timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Builds a context over any transport.
    #[must_use]
    pub fn with_transport(config: &AppConfig, transport: Arc<dyn TransportPort>) -> Self {
        let queue = Arc::new(RequestQueue::new(config.queue.queue_config(), transport));
        let image_cache = Arc::new(BitmapLruCache::new(config.image_cache.max_bytes));
        let image_loader =
            ImageLoader::new(queue.clone(), image_cache.clone() as Arc<dyn ImageCachePort>);

        info!(
            max_workers = config.queue.max_workers,
            cache_bytes = config.image_cache.max_bytes,
            "Client context ready"
        );

        Self {
            queue,
            image_cache,
            image_loader,
        }
    }

    /// Returns the request queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Returns the bitmap cache.
    #[must_use]
    pub fn image_cache(&self) -> &Arc<BitmapLruCache> {
        &self.image_cache
    }

    /// Returns the image loader.
    #[must_use]
    pub const fn image_loader(&self) -> &ImageLoader {
        &self.image_loader
    }

    /// Cancels outstanding requests and stops the dispatcher.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::parsers::StringParser;
    use crate::domain::entities::Request;
    use crate::domain::ports::mocks::ScriptedTransport;

    #[tokio::test]
    async fn test_context_wires_configured_limits() {
        let mut config = AppConfig::default();
        config.queue.max_workers = 2;
        config.image_cache.max_bytes = 1234;

        let transport = Arc::new(ScriptedTransport::new());
        transport.route("http://mock.test/", "hello");
        let context = ClientContext::with_transport(&config, transport);

        assert_eq!(context.queue().config().max_workers, 2);
        assert_eq!(context.image_cache().max_bytes(), 1234);

        let response = context
            .queue()
            .submit(Request::get("http://mock.test/"), StringParser::new())
            .response()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.value(), "hello");

        context.shutdown();
    }

    #[tokio::test]
    async fn test_new_builds_real_transport() {
        let context = ClientContext::new(&AppConfig::default());
        assert!(context.is_ok());
    }
}
