//! Pull-style XML parsing.

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ParserKind, ResponseParser};
use crate::domain::entities::{DEFAULT_PROTOCOL_CHARSET, RawResponse};
use crate::domain::errors::RequestError;

/// Event the cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlEventType {
    /// Initial position, before the first call to `next_event`.
    StartDocument,
    /// Opening tag. Self-closing tags yield a start then an end tag.
    StartTag,
    /// Non-empty character data, entity references resolved.
    Text,
    /// Closing tag.
    EndTag,
    /// End of input. Further calls stay here.
    EndDocument,
}

/// Attribute of the current start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified attribute name.
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

/// Forward-only cursor over the events of one XML document.
///
/// The cursor owns its document, so it can be handed across threads with the
/// delivery. It cannot be rewound; parse the response again for a fresh pass.
pub struct XmlPullCursor {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    event_type: XmlEventType,
    name: Option<String>,
    text: Option<String>,
    attributes: Vec<XmlAttribute>,
    pending_end: Option<String>,
    depth: usize,
}

impl XmlPullCursor {
    /// Creates a cursor positioned at `StartDocument`.
    #[must_use]
    pub fn new(document: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(document.into().into_bytes()));
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            event_type: XmlEventType::StartDocument,
            name: None,
            text: None,
            attributes: Vec::new(),
            pending_end: None,
            depth: 0,
        }
    }

    /// Advances to the next event and returns its type.
    ///
    /// # Errors
    /// Returns `ParseError` on malformed markup such as mismatched tags, or
    /// when the input ends with elements still open. After a truncation error
    /// the cursor moves to `EndDocument`.
    pub fn next_event(&mut self) -> Result<XmlEventType, RequestError> {
        if let Some(name) = self.pending_end.take() {
            self.name = Some(name);
            self.attributes.clear();
            self.text = None;
            self.event_type = XmlEventType::EndTag;
            return Ok(XmlEventType::EndTag);
        }

        if self.event_type == XmlEventType::EndDocument {
            return Ok(XmlEventType::EndDocument);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.depth = 0;
                    return Err(RequestError::parse(format!(
                        "malformed XML near byte {}: {e}",
                        self.reader.buffer_position()
                    )));
                }
            };

            let next = match event {
                Event::Start(start) => {
                    let (name, attributes) = read_start(&start)?;
                    self.depth += 1;
                    self.name = Some(name);
                    self.attributes = attributes;
                    self.text = None;
                    XmlEventType::StartTag
                }
                Event::Empty(start) => {
                    let (name, attributes) = read_start(&start)?;
                    self.pending_end = Some(name.clone());
                    self.name = Some(name);
                    self.attributes = attributes;
                    self.text = None;
                    XmlEventType::StartTag
                }
                Event::End(end) => {
                    self.depth = self.depth.saturating_sub(1);
                    self.name = Some(decode_name(end.name().as_ref()));
                    self.attributes.clear();
                    self.text = None;
                    XmlEventType::EndTag
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| RequestError::parse(format!("bad character data: {e}")))?;
                    if value.is_empty() {
                        continue;
                    }
                    self.text = Some(value.into_owned());
                    self.name = None;
                    self.attributes.clear();
                    XmlEventType::Text
                }
                Event::CData(data) => {
                    self.text = Some(String::from_utf8_lossy(&data).into_owned());
                    self.name = None;
                    self.attributes.clear();
                    XmlEventType::Text
                }
                Event::Eof if self.depth > 0 => {
                    let unclosed = std::mem::take(&mut self.depth);
                    return Err(RequestError::parse(format!(
                        "unexpected end of document: {unclosed} unclosed elements"
                    )));
                }
                Event::Eof => {
                    self.name = None;
                    self.text = None;
                    self.attributes.clear();
                    XmlEventType::EndDocument
                }
                _ => continue,
            };

            self.event_type = next;
            return Ok(next);
        }
    }

    /// Returns the current event type.
    #[must_use]
    pub const fn event_type(&self) -> XmlEventType {
        self.event_type
    }

    /// Tag name on `StartTag` and `EndTag`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Character data on `Text`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Number of attributes on the current start tag.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Attribute name by position.
    #[must_use]
    pub fn attribute_name(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.name.as_str())
    }

    /// Attribute value by position.
    #[must_use]
    pub fn attribute_value(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.value.as_str())
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// All attributes of the current start tag.
    #[must_use]
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }
}

impl std::fmt::Debug for XmlPullCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlPullCursor")
            .field("event_type", &self.event_type)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Iterator for XmlPullCursor {
    type Item = Result<XmlEventType, RequestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.event_type == XmlEventType::EndDocument {
            return None;
        }
        Some(self.next_event())
    }
}

fn decode_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn read_start(start: &BytesStart<'_>) -> Result<(String, Vec<XmlAttribute>), RequestError> {
    let name = decode_name(start.name().as_ref());
    let attributes = start
        .attributes()
        .map(|attribute| {
            let attribute = attribute.map_err(|e| {
                RequestError::parse(format!("malformed attribute in <{name}>: {e}"))
            })?;
            let value = attribute.unescape_value().map_err(|e| {
                RequestError::parse(format!("bad attribute value in <{name}>: {e}"))
            })?;
            Ok(XmlAttribute {
                name: decode_name(attribute.key.as_ref()),
                value: value.into_owned(),
            })
        })
        .collect::<Result<Vec<_>, RequestError>>()?;
    Ok((name, attributes))
}

/// Wraps the body in an [`XmlPullCursor`].
///
/// Markup errors surface lazily from the cursor, not from `parse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullXmlParser;

impl ResponseParser for PullXmlParser {
    type Output = XmlPullCursor;

    fn kind(&self) -> ParserKind {
        ParserKind::PullXml
    }

    fn parse(&self, response: &RawResponse) -> Result<XmlPullCursor, RequestError> {
        let document = response.text(DEFAULT_PROTOCOL_CHARSET)?;
        Ok(XmlPullCursor::new(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use reqwest::header::HeaderMap;

    #[test]
    fn test_self_closing_city() {
        let mut cursor = XmlPullCursor::new(r#"<city name="X"/>"#);
        assert_eq!(cursor.event_type(), XmlEventType::StartDocument);

        assert_eq!(cursor.next_event().unwrap(), XmlEventType::StartTag);
        assert_eq!(cursor.name(), Some("city"));
        assert_eq!(cursor.attribute_value(0), Some("X"));
        assert_eq!(cursor.attribute_name(0), Some("name"));

        assert_eq!(cursor.next_event().unwrap(), XmlEventType::EndTag);
        assert_eq!(cursor.name(), Some("city"));
        assert_eq!(cursor.attribute_count(), 0);

        assert_eq!(cursor.next_event().unwrap(), XmlEventType::EndDocument);
        assert_eq!(cursor.next_event().unwrap(), XmlEventType::EndDocument);
    }

    #[test]
    fn test_collects_city_names() {
        let document = r#"<?xml version="1.0" encoding="utf-8"?>
            <china dn="day">
                <!-- provinces -->
                <city quName="黑龙江" pyName="heilongjiang" cityname="哈尔滨"/>
                <city quName="吉林" pyName="jilin" cityname="长春"/>
            </china>"#;
        let mut cursor = XmlPullCursor::new(document);
        let mut names = Vec::new();

        while cursor.next_event().unwrap() != XmlEventType::EndDocument {
            if cursor.event_type() == XmlEventType::StartTag && cursor.name() == Some("city") {
                names.push(cursor.attribute_value(0).unwrap().to_string());
                assert!(cursor.attribute("cityname").is_some());
            }
        }

        assert_eq!(names, vec!["黑龙江", "吉林"]);
    }

    #[test]
    fn test_text_and_entities() {
        let mut cursor = XmlPullCursor::new("<p>a &amp; b<![CDATA[<raw>]]></p>");
        let events: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            events,
            vec![
                XmlEventType::StartTag,
                XmlEventType::Text,
                XmlEventType::Text,
                XmlEventType::EndTag,
                XmlEventType::EndDocument,
            ]
        );
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_text_value() {
        let mut cursor = XmlPullCursor::new("<temp>  18 &lt; 20 </temp>");
        cursor.next_event().unwrap();
        assert_eq!(cursor.next_event().unwrap(), XmlEventType::Text);
        assert_eq!(cursor.text(), Some("18 < 20"));
        assert_eq!(cursor.name(), None);
    }

    #[test]
    fn test_mismatched_tags() {
        let mut cursor = XmlPullCursor::new("<a><b></a>");
        let result: Result<Vec<_>, _> = cursor.by_ref().collect();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_truncated_document_is_parse_error() {
        let mut cursor = XmlPullCursor::new(r#"<china><city name="X">"#);
        assert_eq!(cursor.next_event().unwrap(), XmlEventType::StartTag);
        assert_eq!(cursor.next_event().unwrap(), XmlEventType::StartTag);
        assert_eq!(cursor.attribute("name"), Some("X"));

        let err = cursor.next_event().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        assert_eq!(cursor.next_event().unwrap(), XmlEventType::EndDocument);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_truncated_document_fails_collect() {
        let cursor = XmlPullCursor::new("<china><city/>");
        let result: Result<Vec<_>, _> = cursor.collect();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_parser_uses_body() {
        let response = RawResponse::new(200, HeaderMap::new(), "<root/>");
        let mut cursor = PullXmlParser.parse(&response).unwrap();
        assert_eq!(cursor.next_event().unwrap(), XmlEventType::StartTag);
        assert_eq!(cursor.name(), Some("root"));
    }
}
