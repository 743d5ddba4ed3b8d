//! Domain entity definitions.

mod bitmap;
mod cache_metadata;
mod request;
mod response;

pub use bitmap::{Bitmap, ColorDepth, DecodeConfig};
pub use cache_metadata::CacheMetadata;
pub use request::{
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, Method, Priority, Request, RequestBody, RequestId,
    RetryPolicy,
};
pub use response::{
    DEFAULT_PROTOCOL_CHARSET, DEFAULT_TEXT_CHARSET, Delivery, RawResponse, Response, decode_text,
};
