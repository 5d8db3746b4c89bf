//! Per-image diagnostics: dimensions, class counts, and path counts.
//!
//! Diagnostics are informational only. They are not part of the
//! persisted document and callers are free to log or ignore them.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PixelColor};

/// Diagnostics collected while converting a single label image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDiagnostics {
    /// Source raster dimensions.
    pub dimensions: Dimensions,
    /// Source raster channel count (3 or 4).
    pub channels: u8,
    /// Polygons carried over from the seed document. Each polygon is
    /// counted once.
    pub seeded_polygons: usize,
    /// One record per traced class, in ascending color order.
    pub classes: Vec<ClassDiagnostics>,
    /// Border walks that failed to close and were dropped.
    pub discarded_traces: usize,
}

/// Diagnostics for one class color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDiagnostics {
    /// The class color.
    pub color: PixelColor,
    /// Number of foreground pixels in the class mask, before smoothing.
    pub pixel_count: u64,
    /// Number of polygons traced for this class.
    pub path_count: usize,
}

impl ImageDiagnostics {
    /// Total number of freshly traced polygons across all classes.
    #[must_use]
    pub fn traced_polygons(&self) -> usize {
        self.classes.iter().map(|c| c.path_count).sum()
    }

    /// Format a human-readable report, one line per class.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::with_capacity(self.classes.len() + 2);
        lines.push(format!(
            "width = {}, height = {}, channels = {}, {} distinct class{}",
            self.dimensions.width,
            self.dimensions.height,
            self.channels,
            self.classes.len(),
            if self.classes.len() == 1 { "" } else { "es" },
        ));
        for class in &self.classes {
            lines.push(format!(" - {}: {} paths", class.color, class.path_count));
        }
        if self.seeded_polygons > 0 {
            lines.push(format!(
                "Appended to {} previous path{}",
                self.seeded_polygons,
                if self.seeded_polygons == 1 { "" } else { "s" },
            ));
        }
        lines.join("\n")
    }
}
