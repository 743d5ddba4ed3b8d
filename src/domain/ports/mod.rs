mod image_cache_port;
mod transport_port;

pub use image_cache_port::ImageCachePort;
pub use transport_port::TransportPort;
