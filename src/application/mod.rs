//! Application layer with response parsers.

/// Response parsers.
pub mod parsers;

pub use parsers::{
    ImageParser, JsonArrayParser, JsonObjectParser, ParserKind, PullXmlParser, ResponseParser,
    StringParser, TypedParser, XmlEventType, XmlPullCursor,
};
