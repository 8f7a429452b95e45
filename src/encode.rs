//! Sprite encoding.
//!
//! Serializes a finished canvas into the compressed byte stream returned by
//! [`Generator::generate`](crate::Generator::generate).

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::error::SpriteError;

/// JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Output encoding of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFormat {
    /// Baseline JPEG. `quality` is clamped to `1..=100`.
    Jpeg {
        /// Encoder quality.
        quality: u8,
    },
    /// Lossless PNG.
    Png,
}

impl Default for SpriteFormat {
    fn default() -> Self {
        SpriteFormat::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl SpriteFormat {
    /// JPEG with the given quality.
    pub fn jpeg(quality: u8) -> Self {
        SpriteFormat::Jpeg { quality }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SpriteFormat::Jpeg { .. } => "jpg",
            SpriteFormat::Png => "png",
        }
    }

    /// Encode `canvas` into a byte vector.
    pub fn encode(&self, canvas: &RgbImage) -> Result<Vec<u8>, SpriteError> {
        let mut buffer = Vec::new();
        match *self {
            SpriteFormat::Jpeg { quality } => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                canvas.write_with_encoder(encoder)?;
            }
            SpriteFormat::Png => {
                canvas.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
            }
        }
        log::debug!(
            "Encoded {}x{} sprite as {self} ({} bytes)",
            canvas.width(),
            canvas.height(),
            buffer.len()
        );
        Ok(buffer)
    }
}

impl Display for SpriteFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SpriteFormat::Jpeg { quality } => write!(f, "JPEG (quality {quality})"),
            SpriteFormat::Png => write!(f, "PNG"),
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{ImageReader, Rgb};

    use super::*;

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(40, 20, Rgb([200, 30, 30]))
    }

    #[test]
    fn jpeg_output_decodes_with_same_dimensions() {
        let bytes = SpriteFormat::jpeg(90).encode(&canvas()).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn png_output_is_lossless() {
        let bytes = SpriteFormat::Png.encode(&canvas()).unwrap();
        let format = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(ImageFormat::Png));

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, canvas());
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        assert!(SpriteFormat::jpeg(0).encode(&canvas()).is_ok());
        assert!(SpriteFormat::jpeg(255).encode(&canvas()).is_ok());
    }
}
