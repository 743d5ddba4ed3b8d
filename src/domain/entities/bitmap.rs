//! Decoded in-memory images.

use std::str::FromStr;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::domain::errors::RequestError;

/// Pixel layout a decoded image is converted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    /// 8-bit RGBA, 4 bytes per pixel.
    #[default]
    Rgba8,
    /// 8-bit RGB, 3 bytes per pixel.
    Rgb8,
    /// 8-bit grayscale with alpha, 2 bytes per pixel.
    LumaA8,
    /// 8-bit grayscale, 1 byte per pixel.
    Luma8,
}

impl ColorDepth {
    /// Bytes used by one pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::LumaA8 => 2,
            Self::Luma8 => 1,
        }
    }

    fn convert(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Rgba8 => DynamicImage::ImageRgba8(image.into_rgba8()),
            Self::Rgb8 => DynamicImage::ImageRgb8(image.into_rgb8()),
            Self::LumaA8 => DynamicImage::ImageLumaA8(image.into_luma_alpha8()),
            Self::Luma8 => DynamicImage::ImageLuma8(image.into_luma8()),
        }
    }
}

impl std::fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rgba8 => write!(f, "rgba8"),
            Self::Rgb8 => write!(f, "rgb8"),
            Self::LumaA8 => write!(f, "lumaa8"),
            Self::Luma8 => write!(f, "luma8"),
        }
    }
}

impl FromStr for ColorDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgba8" | "argb8888" => Ok(Self::Rgba8),
            "rgb8" | "rgb565" => Ok(Self::Rgb8),
            "lumaa8" => Ok(Self::LumaA8),
            "luma8" | "alpha8" => Ok(Self::Luma8),
            other => Err(format!("unknown color depth {other:?}")),
        }
    }
}

/// How raw image bytes are turned into a [`Bitmap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecodeConfig {
    /// Target pixel layout.
    pub color: ColorDepth,
    /// Maximum width in pixels, `0` for unbounded.
    pub max_width: u32,
    /// Maximum height in pixels, `0` for unbounded.
    pub max_height: u32,
}

impl DecodeConfig {
    /// Creates an unbounded configuration with the given layout.
    #[must_use]
    pub const fn new(color: ColorDepth) -> Self {
        Self {
            color,
            max_width: 0,
            max_height: 0,
        }
    }

    /// Bounds the decoded size. Images are scaled down to fit, never up.
    #[must_use]
    pub const fn with_max_size(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    const fn bounds(&self) -> (u32, u32) {
        let width = if self.max_width == 0 { u32::MAX } else { self.max_width };
        let height = if self.max_height == 0 { u32::MAX } else { self.max_height };
        (width, height)
    }
}

/// A decoded image with a fixed pixel layout.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: DynamicImage,
    color: ColorDepth,
}

impl Bitmap {
    /// Wraps an image, converting it to `color`.
    #[must_use]
    pub fn from_image(image: DynamicImage, color: ColorDepth) -> Self {
        Self {
            image: color.convert(image),
            color,
        }
    }

    /// Decodes an encoded raster image.
    ///
    /// # Errors
    /// Returns `DecodeError` if the format is unknown or the data is corrupt.
    pub fn decode(bytes: &[u8], config: &DecodeConfig) -> Result<Self, RequestError> {
        let mut image = image::load_from_memory(bytes)
            .map_err(|e| RequestError::decode_with(format!("failed to decode image: {e}"), e))?;

        let (max_width, max_height) = config.bounds();
        if image.width() > max_width || image.height() > max_height {
            image = image.resize(max_width, max_height, FilterType::Lanczos3);
        }

        Ok(Self::from_image(image, config.color))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel layout.
    #[must_use]
    pub const fn color(&self) -> ColorDepth {
        self.color
    }

    /// Bytes in one pixel row.
    #[must_use]
    pub fn row_bytes(&self) -> usize {
        self.width() as usize * self.color.bytes_per_pixel()
    }

    /// Size of the raw pixel buffer, `row_bytes * height`.
    #[must_use]
    pub fn byte_count(&self) -> usize {
        self.row_bytes() * self.height() as usize
    }

    /// Borrows the underlying image.
    #[must_use]
    pub const fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Returns the underlying image.
    #[must_use]
    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_byte_count_uses_decoded_layout() {
        let bitmap = Bitmap::from_image(DynamicImage::new_rgb8(10, 5), ColorDepth::Rgba8);
        assert_eq!(bitmap.row_bytes(), 40);
        assert_eq!(bitmap.byte_count(), 200);

        let gray = Bitmap::from_image(DynamicImage::new_rgb8(10, 5), ColorDepth::Luma8);
        assert_eq!(gray.byte_count(), 50);
    }

    #[test]
    fn test_decode_png() {
        let bitmap = Bitmap::decode(&png(8, 4), &DecodeConfig::default()).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (8, 4));
        assert_eq!(bitmap.color(), ColorDepth::Rgba8);
    }

    #[test]
    fn test_decode_scales_down_preserving_aspect() {
        let config = DecodeConfig::new(ColorDepth::Rgb8).with_max_size(50, 50);
        let bitmap = Bitmap::decode(&png(200, 100), &config).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (50, 25));
    }

    #[test]
    fn test_decode_never_scales_up() {
        let config = DecodeConfig::new(ColorDepth::Rgb8).with_max_size(500, 0);
        let bitmap = Bitmap::decode(&png(20, 10), &config).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (20, 10));
    }

    #[test]
    fn test_corrupt_data_is_decode_error() {
        let err = Bitmap::decode(b"\x89PNG\r\n\x1a\nnot really", &DecodeConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_color_depth_from_str() {
        assert_eq!("RGB565".parse::<ColorDepth>(), Ok(ColorDepth::Rgb8));
        assert!("cmyk".parse::<ColorDepth>().is_err());
    }
}
