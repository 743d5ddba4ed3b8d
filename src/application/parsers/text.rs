//! Plain text parser.

use tracing::debug;

use super::{ParserKind, ResponseParser};
use crate::domain::entities::{DEFAULT_TEXT_CHARSET, RawResponse};
use crate::domain::errors::RequestError;

/// Decodes the body as text using the declared charset.
///
/// Bodies in an unsupported charset are decoded as UTF-8 instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct StringParser {
    default_charset: &'static str,
}

impl StringParser {
    /// Creates a parser assuming ISO-8859-1 when no charset is declared.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_charset: DEFAULT_TEXT_CHARSET,
        }
    }

    /// Overrides the charset assumed when none is declared.
    #[must_use]
    pub const fn with_default_charset(mut self, charset: &'static str) -> Self {
        self.default_charset = charset;
        self
    }
}

impl Default for StringParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser for StringParser {
    type Output = String;

    fn kind(&self) -> ParserKind {
        ParserKind::PlainText
    }

    fn parse(&self, response: &RawResponse) -> Result<String, RequestError> {
        match response.text(self.default_charset) {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!(error = %e, "Falling back to UTF-8");
                Ok(String::from_utf8_lossy(response.body()).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

    fn response(content_type: &'static str, body: &'static [u8]) -> RawResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        RawResponse::new(200, headers, body)
    }

    #[test]
    fn test_default_charset_is_latin1() {
        let parsed = StringParser::new().parse(&response("text/html", b"\xe9t\xe9"));
        assert_eq!(parsed.unwrap(), "été");
    }

    #[test]
    fn test_declared_charset_wins() {
        let parsed = StringParser::new().parse(&response("text/html; charset=UTF-8", "été".as_bytes()));
        assert_eq!(parsed.unwrap(), "été");
    }

    #[test]
    fn test_unsupported_charset_falls_back_to_utf8() {
        let parsed = StringParser::new().parse(&response("text/html; charset=gbk", b"hello"));
        assert_eq!(parsed.unwrap(), "hello");
    }

    #[test]
    fn test_custom_default_charset() {
        let parser = StringParser::new().with_default_charset("utf-8");
        let parsed = parser.parse(&response("text/plain", "naïve".as_bytes()));
        assert_eq!(parsed.unwrap(), "naïve");
    }
}
