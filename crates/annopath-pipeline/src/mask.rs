//! Class mask construction.
//!
//! Isolates the pixels of one class color into a binary [`GrayImage`]
//! (foreground `255`, background `0`). Matching is exact on all four
//! channels; there is no tolerance.

use crate::raster::LabelImage;
use crate::types::{BACKGROUND, FOREGROUND, GrayImage, PixelColor};

/// Build a binary mask that is foreground exactly where `image` has `color`.
#[must_use = "returns the class mask"]
pub fn build_mask(image: &LabelImage, color: PixelColor) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.color_at(x, y) == color {
            image::Luma([FOREGROUND])
        } else {
            image::Luma([BACKGROUND])
        }
    })
}

/// Count the foreground pixels of a binary mask.
#[must_use]
pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != BACKGROUND)).sum()
}
