//! Response parsers turning raw bytes into typed values.
//!
//! Every request submitted to the queue is paired with a parser. Parsing
//! runs on a blocking worker after the transport completes and before the
//! result is delivered.

mod image;
mod json;
mod text;
mod typed;
mod xml;

pub use image::ImageParser;
pub use json::{JsonArrayParser, JsonObjectParser};
pub use text::StringParser;
pub use typed::TypedParser;
pub use xml::{PullXmlParser, XmlAttribute, XmlEventType, XmlPullCursor};

use crate::domain::entities::RawResponse;
use crate::domain::errors::RequestError;

/// Shape of the value a parser produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    /// Decoded text.
    PlainText,
    /// JSON object.
    JsonObject,
    /// JSON array.
    JsonArray,
    /// Value deserialized into a caller-supplied type.
    TypedObject,
    /// Decoded bitmap.
    RawImage,
    /// Forward-only XML event cursor.
    PullXml,
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainText => write!(f, "text"),
            Self::JsonObject => write!(f, "json-object"),
            Self::JsonArray => write!(f, "json-array"),
            Self::TypedObject => write!(f, "typed"),
            Self::RawImage => write!(f, "image"),
            Self::PullXml => write!(f, "xml"),
        }
    }
}

/// Converts a raw response into a typed value.
pub trait ResponseParser: Send + Sync + 'static {
    /// Parsed value type.
    type Output: Send + 'static;

    /// Returns the parser variant, used for logging.
    fn kind(&self) -> ParserKind;

    /// Parses the response.
    ///
    /// # Errors
    /// Returns `ParseError` (or `DecodeError` for images) when the body does
    /// not match the expected shape or encoding.
    fn parse(&self, response: &RawResponse) -> Result<Self::Output, RequestError>;
}
