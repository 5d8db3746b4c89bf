//! Mask smoothing: box blur followed by a midpoint threshold.
//!
//! Hard-edged class masks produce boundaries full of single-pixel
//! jaggies. Blurring the mask with a `(2r + 1) x (2r + 1)` averaging
//! kernel and re-thresholding at 127.5 rounds those off before tracing.
//!
//! The average is never materialized as an 8-bit image: a pixel is
//! foreground when `255 * count / n > 127.5`, i.e. when `2 * count > n`,
//! where `count` is the number of foreground samples under the kernel and
//! `n` is the kernel area. Working on exact integer counts keeps the stage
//! deterministic and avoids the truncation of a separable 8-bit box
//! filter. Samples outside the image replicate the nearest edge pixel.

use crate::types::{BACKGROUND, FOREGROUND, GrayImage};

/// Smooth a binary mask with a box blur of the given radius.
///
/// A radius of `0` returns the mask unchanged. Output dimensions always
/// match the input.
#[must_use = "returns the smoothed mask"]
#[allow(clippy::cast_possible_truncation)]
pub fn smooth_mask(mask: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    if radius == 0 || w == 0 || h == 0 {
        return mask.clone();
    }

    let r = radius as usize;
    let (w, h) = (w as usize, h as usize);

    // Horizontal pass: per-row window counts of foreground samples.
    let mut row_counts = vec![0_u64; w * h];
    let mut row = vec![0_u64; w];
    for y in 0..h {
        for (x, value) in row.iter_mut().enumerate() {
            *value = u64::from(mask.as_raw()[y * w + x] != BACKGROUND);
        }
        row_counts[y * w..(y + 1) * w].copy_from_slice(&clamped_window_sums(&row, r));
    }

    // Vertical pass over the row counts, then threshold.
    let side = 2 * u128::from(radius) + 1;
    let area = side * side;
    let mut out = GrayImage::new(w as u32, h as u32);
    let mut column = vec![0_u64; h];
    for x in 0..w {
        for (y, value) in column.iter_mut().enumerate() {
            *value = row_counts[y * w + x];
        }
        let totals = clamped_window_sums_wide(&column, r);
        for (y, total) in totals.into_iter().enumerate() {
            let value = if 2 * total > area { FOREGROUND } else { BACKGROUND };
            out.put_pixel(x as u32, y as u32, image::Luma([value]));
        }
    }
    out
}

/// Sum of `values` over a `2 * radius + 1` window centered on each index,
/// replicating the first and last elements past the ends.
fn clamped_window_sums(values: &[u64], radius: usize) -> Vec<u64> {
    clamped_window_sums_wide(values, radius)
        .into_iter()
        .map(|s| u64::try_from(s).unwrap_or(u64::MAX))
        .collect()
}

fn clamped_window_sums_wide(values: &[u64], radius: usize) -> Vec<u128> {
    let Some(last) = values.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0_u128);
    for &v in values {
        let running = prefix[prefix.len() - 1];
        prefix.push(running + u128::from(v));
    }

    let first = u128::from(values[0]);
    let final_value = u128::from(values[last]);
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = i.saturating_add(radius).min(last);
            let left_extra = radius.saturating_sub(i) as u128;
            let right_extra = i.saturating_add(radius).saturating_sub(last) as u128;
            prefix[hi + 1] - prefix[lo] + left_extra * first + right_extra * final_value
        })
        .collect()
}
