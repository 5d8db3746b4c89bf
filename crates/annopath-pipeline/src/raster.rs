//! Label image decoding.
//!
//! Accepts raw image bytes and produces a [`LabelImage`]: an 8-bit RGB
//! or RGBA raster whose pixel colors encode class labels. No color
//! conversion is applied during decoding, since converting would alter
//! the exact label values the classifier keys on.

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::types::{Dimensions, PipelineError, PixelColor};

/// An 8-bit label raster with three or four channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelImage {
    /// Three channels; every pixel reads as opaque.
    Rgb(RgbImage),
    /// Four channels.
    Rgba(RgbaImage),
}

impl LabelImage {
    /// Wrap a decoded image, rejecting unsupported pixel layouts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedChannelCount`] when the image
    /// does not have exactly 3 or 4 channels, and
    /// [`PipelineError::UnsupportedSampleDepth`] when it does but its
    /// samples are not 8-bit.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, PipelineError> {
        let color = image.color();
        let channels = color.channel_count();
        if channels != 3 && channels != 4 {
            return Err(PipelineError::UnsupportedChannelCount(channels));
        }

        match image {
            DynamicImage::ImageRgb8(img) => Ok(Self::Rgb(img)),
            DynamicImage::ImageRgba8(img) => Ok(Self::Rgba(img)),
            _ => Err(PipelineError::UnsupportedSampleDepth {
                bits_per_channel: color.bits_per_pixel() / u16::from(channels),
            }),
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb(img) => img.width(),
            Self::Rgba(img) => img.width(),
        }
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb(img) => img.height(),
            Self::Rgba(img) => img.height(),
        }
    }

    /// Image dimensions in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Number of channels in the underlying raster (3 or 4).
    #[must_use]
    pub const fn channel_count(&self) -> u8 {
        match self {
            Self::Rgb(_) => 3,
            Self::Rgba(_) => 4,
        }
    }

    /// Color of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds, like [`image::ImageBuffer::get_pixel`].
    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> PixelColor {
        match self {
            Self::Rgb(img) => PixelColor::from(*img.get_pixel(x, y)),
            Self::Rgba(img) => PixelColor::from(*img.get_pixel(x, y)),
        }
    }
}

impl From<RgbaImage> for LabelImage {
    fn from(image: RgbaImage) -> Self {
        Self::Rgba(image)
    }
}

impl From<RgbImage> for LabelImage {
    fn from(image: RgbImage) -> Self {
        Self::Rgb(image)
    }
}

/// Decode raw image bytes into a [`LabelImage`] without color conversion.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`PipelineError::UnsupportedChannelCount`] or
/// [`PipelineError::UnsupportedSampleDepth`] for layouts other than
/// 8-bit RGB or RGBA.
pub fn decode_label_image(bytes: &[u8]) -> Result<LabelImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    LabelImage::from_dynamic(img)
}
