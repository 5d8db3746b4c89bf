//! Color classification: find the distinct class colors of a label image.
//!
//! Every pixel is visited exactly once and compared against the clean
//! color before being inserted into an ordered set, so the resulting
//! classes iterate in ascending [`PixelColor`] order.

use std::collections::BTreeSet;

use crate::raster::LabelImage;
use crate::types::PixelColor;

/// Collect the distinct colors present in `image`, excluding `clean_color`.
#[must_use = "returns the set of class colors"]
pub fn classify(image: &LabelImage, clean_color: PixelColor) -> BTreeSet<PixelColor> {
    let mut colors = BTreeSet::new();
    for y in 0..image.height() {
        for x in 0..image.width() {
            let color = image.color_at(x, y);
            if color != clean_color {
                colors.insert(color);
            }
        }
    }
    colors
}
