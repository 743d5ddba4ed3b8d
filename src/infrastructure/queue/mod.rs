//! Prioritized request queue.

mod job;
pub mod request_queue;

pub use request_queue::{DEFAULT_MAX_WORKERS, RequestHandle, RequestQueue, RequestQueueConfig};
