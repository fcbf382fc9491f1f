//! Decoded image wrapper with an explicit memory cost

use crate::error::Result;
use image::{ColorType, DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// A decoded image as held by the memory tier
#[derive(Debug, Clone)]
pub struct Image {
    inner: DynamicImage,
}

impl Image {
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    /// Decode encoded bytes (jpeg, png or webp). Returns `None` when the data
    /// is corrupt or in an unsupported format.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match image::load_from_memory(bytes) {
            Ok(inner) => Some(Self { inner }),
            Err(e) => {
                debug!(len = bytes.len(), error = %e, "Failed to decode image bytes");
                None
            }
        }
    }

    /// Encode losslessly as PNG for the disk tier
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.inner.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn color(&self) -> ColorType {
        self.inner.color()
    }

    /// Approximate decoded footprint in bytes
    pub fn cost(&self) -> u64 {
        decoded_cost(self.width(), self.height(), self.color())
    }
}

impl From<DynamicImage> for Image {
    fn from(inner: DynamicImage) -> Self {
        Self::new(inner)
    }
}

/// Content equality: same dimensions, color type and pixel data
impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.color() == other.color()
            && self.inner.as_bytes() == other.inner.as_bytes()
    }
}

impl Eq for Image {}

/// Cost of a decoded pixel buffer of the given shape
pub fn decoded_cost(width: u32, height: u32, color: ColorType) -> u64 {
    u64::from(width) * u64::from(height) * u64::from(color.bytes_per_pixel())
}

#[cfg(test)]
pub(crate) fn sample_image(seed: u8) -> Image {
    let buf = image::RgbaImage::from_fn(8, 6, |x, y| {
        image::Rgba([x as u8 ^ seed, y as u8, seed, 255])
    });
    Image::new(DynamicImage::ImageRgba8(buf))
}
