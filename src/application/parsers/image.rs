//! Image decoding parser.

use super::{ParserKind, ResponseParser};
use crate::domain::entities::{Bitmap, DecodeConfig, RawResponse};
use crate::domain::errors::RequestError;

/// Decodes the body into a [`Bitmap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageParser {
    config: DecodeConfig,
}

impl ImageParser {
    /// Creates a parser with the given decode options.
    #[must_use]
    pub const fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// Returns the decode options.
    #[must_use]
    pub const fn config(&self) -> &DecodeConfig {
        &self.config
    }
}

impl ResponseParser for ImageParser {
    type Output = Bitmap;

    fn kind(&self) -> ParserKind {
        ParserKind::RawImage
    }

    fn parse(&self, response: &RawResponse) -> Result<Bitmap, RequestError> {
        Bitmap::decode(response.body(), &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ColorDepth;
    use crate::domain::errors::ErrorKind;
    use reqwest::header::HeaderMap;
    use std::io::Cursor;

    #[test]
    fn test_decodes_with_requested_depth() {
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::new_rgba8(4, 2)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let response = RawResponse::new(200, HeaderMap::new(), png.into_inner());

        let parser = ImageParser::new(DecodeConfig::new(ColorDepth::Rgb8));
        let bitmap = parser.parse(&response).unwrap();
        assert_eq!(bitmap.color(), ColorDepth::Rgb8);
        assert_eq!(bitmap.byte_count(), 4 * 3 * 2);
    }

    #[test]
    fn test_html_body_is_decode_error() {
        let response = RawResponse::new(200, HeaderMap::new(), "<html>not found</html>");
        let err = ImageParser::default().parse(&response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
