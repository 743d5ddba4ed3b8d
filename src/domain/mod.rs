//! Domain layer with core request entities and port definitions.

/// Cooperative cancellation.
pub mod cancel;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use cancel::CancellationToken;
pub use entities::{Bitmap, Delivery, RawResponse, Request, RequestId, Response};
pub use errors::{ErrorKind, RequestError};
pub use ports::{ImageCachePort, TransportPort};
