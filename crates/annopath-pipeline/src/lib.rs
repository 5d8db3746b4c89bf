//! annopath-pipeline: Pure label-image to polygon pipeline (sans-IO).
//!
//! Converts a label raster, where each pixel color names a class, into
//! closed boundary polygons per class:
//! classify -> per class: mask -> optional smoothing -> contour tracing
//! -> merge into an [`AnnotationDocument`].
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! rasters and returns structured data. Serialization lives in
//! `annopath-export`, and all filesystem interaction in the `annopath`
//! binary.

pub mod classify;
pub mod contour;
pub mod diagnostics;
pub mod document;
pub mod mask;
pub mod raster;
pub mod smooth;
pub mod types;

pub use classify::classify;
pub use contour::{BorderKind, Contour, ContourSet, ContourTracer, ContourTracerKind, trace};
pub use diagnostics::{ClassDiagnostics, ImageDiagnostics};
pub use document::{AnnotationDocument, MergeMode};
pub use mask::build_mask;
pub use raster::{LabelImage, decode_label_image};
pub use smooth::smooth_mask;
pub use types::{
    ConvertConfig, Dimensions, GrayImage, ParseColorError, PipelineError, PixelColor, Point,
    Polygon,
};

/// Convert one label image into an annotation document.
///
/// When `config.append` is set, `seed` (typically decoded from a previous
/// output file) is used as the starting document and freshly traced
/// polygons are appended after the ones it already holds. Otherwise the
/// seed is ignored and the document starts empty. Any entry the seed has
/// for the clean color is dropped.
///
/// # Pipeline steps
///
/// 1. Collect the distinct non-clean colors, in ascending order
/// 2. For each color, build its binary mask
/// 3. Box-blur and re-threshold the mask (when `blur_radius > 0`)
/// 4. Trace outer and hole borders
/// 5. Replace or append the class entry
#[must_use = "returns the converted document and its diagnostics"]
pub fn process_image(
    image: &LabelImage,
    config: &ConvertConfig,
    seed: Option<AnnotationDocument>,
) -> (AnnotationDocument, ImageDiagnostics) {
    let mode = MergeMode::from_append(config.append);
    let mut document = match mode {
        MergeMode::Append => seed.unwrap_or_default(),
        MergeMode::Replace => AnnotationDocument::new(),
    };
    if let Some(dropped) = document.remove(config.clean_color) {
        tracing::debug!(
            color = %config.clean_color,
            polygons = dropped.len(),
            "dropped seeded entry for the clean color"
        );
    }

    let mut diagnostics = ImageDiagnostics {
        dimensions: image.dimensions(),
        channels: image.channel_count(),
        seeded_polygons: document.polygon_count(),
        classes: Vec::new(),
        discarded_traces: 0,
    };

    // 1. Classify.
    let colors = classify::classify(image, config.clean_color);
    tracing::debug!(classes = colors.len(), "classified label image");

    let tracer = ContourTracerKind::default();
    for color in colors {
        // 2. Mask.
        let class_mask = mask::build_mask(image, color);
        let pixel_count = mask::foreground_count(&class_mask);

        // 3. Smoothing.
        let smoothed = smooth::smooth_mask(&class_mask, config.blur_radius);

        // 4. Contour tracing.
        let traced = tracer.trace(&smoothed);
        diagnostics.discarded_traces += traced.discarded;
        let polygons = traced.into_polygons();
        tracing::debug!(%color, paths = polygons.len(), "traced class");

        diagnostics.classes.push(ClassDiagnostics {
            color,
            pixel_count,
            path_count: polygons.len(),
        });

        // 5. Merge.
        document.merge(color, polygons, mode);
    }

    (document, diagnostics)
}
