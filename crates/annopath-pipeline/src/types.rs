//! Shared types for the annopath label-image pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference binary
/// masks without depending on `image` directly.
///
/// Masks use `255` for foreground and `0` for background. Any non-zero
/// sample is treated as foreground by the contour tracer.
pub use image::GrayImage;

/// Sample value written for foreground pixels of a binary mask.
pub const FOREGROUND: u8 = 255;

/// Sample value written for background pixels of a binary mask.
pub const BACKGROUND: u8 = 0;

/// A pixel color used as a class label.
///
/// Rasters without an alpha channel are read with `a = 255`. Colors are
/// totally ordered lexicographically over `(r, g, b, a)`, which fixes the
/// iteration order of classes and of the serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PixelColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl PixelColor {
    /// Alpha assumed for colors read from rasters without an alpha channel.
    pub const OPAQUE: u8 = 255;

    /// Create a color from all four channels.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from three channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, Self::OPAQUE)
    }

    /// Channels in `[r, g, b, a]` order.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<image::Rgba<u8>> for PixelColor {
    fn from(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = pixel.0;
        Self::rgba(r, g, b, a)
    }
}

impl From<image::Rgb<u8>> for PixelColor {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self::rgb(r, g, b)
    }
}

/// Formats as `0xRRGGBBAA`.
impl fmt::Display for PixelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Error returned when parsing a [`PixelColor`] from a hex string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {input:?}: expected RRGGBB or RRGGBBAA hex digits")]
pub struct ParseColorError {
    input: String,
}

/// Parses `RRGGBB` or `RRGGBBAA` hex, optionally prefixed with `#` or `0x`.
impl FromStr for PixelColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError {
            input: s.to_owned(),
        };
        let digits = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());
        let r = channel(0)?;
        let g = channel(2)?;
        let b = channel(4)?;
        let a = if digits.len() == 8 {
            channel(6)?
        } else {
            Self::OPAQUE
        };
        Ok(Self::rgba(r, g, b, a))
    }
}

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: i32,
    /// Row (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A closed boundary, stored without a duplicate of its first point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polygon.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Configuration for converting one label image.
///
/// Passed explicitly to every core call; there is no global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// The "no label" color. It is never classified and never gets an
    /// entry in the output document.
    pub clean_color: PixelColor,

    /// Box-blur radius applied to each class mask before tracing.
    /// `0` disables smoothing.
    pub blur_radius: u32,

    /// Append freshly traced polygons to those loaded from a previous
    /// output file instead of starting from an empty document.
    pub append: bool,
}

impl ConvertConfig {
    /// Default clean color: translucent green.
    pub const DEFAULT_CLEAN_COLOR: PixelColor = PixelColor::rgba(0, 255, 0, 64);

    /// Default blur radius (smoothing disabled).
    pub const DEFAULT_BLUR_RADIUS: u32 = 0;
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            clean_color: Self::DEFAULT_CLEAN_COLOR,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            append: false,
        }
    }
}

/// Errors that can occur while preparing a label image for processing.
///
/// None of these are fatal to a batch: the driver reports them and moves
/// on to the next image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The raster has a channel count other than 3 or 4.
    #[error("unsupported channel count: {0} (expecting 3 or 4 channels)")]
    UnsupportedChannelCount(u8),

    /// The raster has 3 or 4 channels but samples wider than 8 bits.
    #[error("unsupported sample depth: {bits_per_channel} bits per channel (expecting 8)")]
    UnsupportedSampleDepth {
        /// Bits per channel of the rejected raster.
        bits_per_channel: u16,
    },
}
