//! Cached, batched image loading on top of the request queue.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::application::parsers::ImageParser;
use crate::domain::entities::{Bitmap, ColorDepth, DecodeConfig, Request, RequestId};
use crate::domain::errors::RequestError;
use crate::domain::ports::ImageCachePort;
use crate::infrastructure::queue::RequestQueue;

/// Outcome of one image load.
pub type BitmapResult = Result<Arc<Bitmap>, RequestError>;

type Batches = Arc<Mutex<HashMap<String, Batch>>>;

/// Callers waiting on the same cache key.
struct Batch {
    request: Option<RequestId>,
    waiters: Vec<oneshot::Sender<BitmapResult>>,
}

/// Removes its batch when the load finishes or is dropped unfinished.
struct BatchGuard {
    key: String,
    batches: Batches,
    finished: bool,
}

impl BatchGuard {
    fn complete(mut self, result: &BitmapResult) {
        self.finished = true;
        let waiters = self
            .batches
            .lock()
            .remove(&self.key)
            .map(|batch| batch.waiters)
            .unwrap_or_default();
        trace!(key = %self.key, waiters = waiters.len(), "Image batch complete");
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if !self.finished && self.batches.lock().remove(&self.key).is_some() {
            debug!(key = %self.key, "Image load abandoned");
        }
    }
}

/// Builds the cache key for a URL decoded within the given bounds.
#[must_use]
pub fn cache_key(url: &str, max_width: u32, max_height: u32) -> String {
    format!("#W{max_width}#H{max_height}{url}")
}

/// Loads images through the request queue, memoizing decoded bitmaps.
///
/// Concurrent loads of the same URL and bounds share one network request.
pub struct ImageLoader {
    queue: Arc<RequestQueue>,
    cache: Arc<dyn ImageCachePort>,
    batches: Batches,
    color: ColorDepth,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("color", &self.color)
            .field("in_flight", &self.batches.lock().len())
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates a loader decoding to RGBA.
    #[must_use]
    pub fn new(queue: Arc<RequestQueue>, cache: Arc<dyn ImageCachePort>) -> Self {
        Self {
            queue,
            cache,
            batches: Arc::default(),
            color: ColorDepth::default(),
        }
    }

    /// Sets the pixel layout used for decoding.
    #[must_use]
    pub const fn with_color(mut self, color: ColorDepth) -> Self {
        self.color = color;
        self
    }

    /// Returns the cached bitmap without touching the network.
    #[must_use]
    pub fn cached(&self, url: &str, max_width: u32, max_height: u32) -> Option<Arc<Bitmap>> {
        self.cache.get(&cache_key(url, max_width, max_height))
    }

    /// Loads an image, from cache when possible.
    ///
    /// Returns `None` if the load was cancelled.
    pub async fn get(&self, url: &str, max_width: u32, max_height: u32) -> Option<BitmapResult> {
        let key = cache_key(url, max_width, max_height);
        if let Some(bitmap) = self.cache.get(&key) {
            trace!(key = %key, "Image served from cache");
            return Some(Ok(bitmap));
        }

        let (tx, rx) = oneshot::channel();
        let start = {
            let mut batches = self.batches.lock();
            if let Some(batch) = batches.get_mut(&key) {
                batch.waiters.push(tx);
                false
            } else {
                batches.insert(
                    key.clone(),
                    Batch {
                        request: None,
                        waiters: vec![tx],
                    },
                );
                true
            }
        };

        if start {
            self.start_load(url, key, max_width, max_height);
        } else {
            debug!(key = %key, "Joining in-flight image load");
        }

        rx.await.ok()
    }

    /// Cancels the in-flight load for a URL and bounds. Every waiter gets `None`.
    pub fn cancel(&self, url: &str, max_width: u32, max_height: u32) -> bool {
        let key = cache_key(url, max_width, max_height);
        let request = self.batches.lock().get(&key).and_then(|batch| batch.request);
        request.is_some_and(|id| self.queue.cancel(id))
    }

    /// Returns the number of distinct loads in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.batches.lock().len()
    }

    fn start_load(&self, url: &str, key: String, max_width: u32, max_height: u32) {
        let parser =
            ImageParser::new(DecodeConfig::new(self.color).with_max_size(max_width, max_height));
        let guard = BatchGuard {
            key: key.clone(),
            batches: self.batches.clone(),
            finished: false,
        };
        let cache = self.cache.clone();

        let id = self
            .queue
            .submit_with(Request::get(url), parser, move |delivery| {
                let result = delivery.map(|response| {
                    let bitmap = Arc::new(response.into_value());
                    cache.put(&guard.key, bitmap.clone());
                    bitmap
                });
                guard.complete(&result);
            });

        debug!(key = %key, id = %id, "Started image load");
        if let Some(batch) = self.batches.lock().get_mut(&key) {
            batch.request = Some(id);
        }
    }
}
