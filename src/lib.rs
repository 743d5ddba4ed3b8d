//! Volea - an asynchronous HTTP request queue with pluggable response parsers.
//!
//! Requests are submitted to a bounded worker pool, executed over reqwest,
//! parsed into text, JSON, typed values, bitmaps or a pull-style XML cursor,
//! and delivered exactly once unless cancelled. Decoded images are memoized in
//! a byte-bounded LRU cache.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing response parsers.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "volea";
