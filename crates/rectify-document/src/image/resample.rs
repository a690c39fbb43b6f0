// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aspect-preserving resizing and the output size clamp.

use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::{debug, instrument};

/// Resampling kernel used when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    /// Area averaging for reductions (the triangle kernel widens with the
    /// reduction factor, so every source pixel contributes).
    Area,
    /// Bicubic (Catmull-Rom) for enlargements.
    Cubic,
    /// Bilinear, for quick working copies.
    Linear,
}

impl Resample {
    const fn filter(self) -> FilterType {
        match self {
            Self::Area | Self::Linear => FilterType::Triangle,
            Self::Cubic => FilterType::CatmullRom,
        }
    }
}

/// Dimensions with the longer side set to exactly `bound` and the shorter
/// side scaled proportionally (truncated, at least 1).
pub fn scaled_dims(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let long = width.max(height).max(1);
    let bound = bound.max(1);
    let scale_short =
        |short: u32| ((u64::from(short) * u64::from(bound) / u64::from(long)) as u32).max(1);
    if width >= height {
        (bound, scale_short(height))
    } else {
        (scale_short(width), bound)
    }
}

/// Resize so the longer side equals `bound`.
pub fn resize_long_side(image: &RgbImage, bound: u32, kernel: Resample) -> RgbImage {
    let (w, h) = scaled_dims(image.width(), image.height(), bound);
    if (w, h) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, w, h, kernel.filter())
}

/// `(min_allowed, max_allowed)` long-side bounds relative to `reference`.
pub fn clamp_bounds(reference: u32, max_factor: f32, min_factor: f32) -> (u32, u32) {
    let max_allowed = (reference as f32 * max_factor) as u32;
    let min_allowed = (reference as f32 * min_factor) as u32;
    (min_allowed.max(1), max_allowed.max(1))
}

/// Keep the longer side within `[reference * min_factor, reference * max_factor]`.
///
/// Oversized images are area-averaged down to the upper bound, undersized
/// ones enlarged bicubically to the lower bound; anything in between is
/// returned as is.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn clamp_size(image: RgbImage, reference: u32, max_factor: f32, min_factor: f32) -> RgbImage {
    let (min_allowed, max_allowed) = clamp_bounds(reference, max_factor, min_factor);
    let long = image.width().max(image.height());

    if long > max_allowed {
        debug!(long, max_allowed, "Downscaling oversized output");
        resize_long_side(&image, max_allowed, Resample::Area)
    } else if long < min_allowed {
        debug!(long, min_allowed, "Upscaling undersized output");
        resize_long_side(&image, min_allowed, Resample::Cubic)
    } else {
        image
    }
}
