// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded-size copies for on-screen preview.

use std::borrow::Cow;

use image::RgbImage;

use super::resample::{Resample, resize_long_side};

/// Default longest side of a preview.
pub const DEFAULT_DISPLAY_MAX: u32 = 1200;

/// Factor that brings `(width, height)` within `max_dim`; never above 1.
pub fn display_scale(width: u32, height: u32, max_dim: u32) -> f32 {
    let long = width.max(height);
    if long <= max_dim || long == 0 {
        1.0
    } else {
        max_dim as f32 / long as f32
    }
}

/// A copy of `image` no larger than `max_dim` on its longer side.
///
/// Images already within bounds are borrowed as is; larger ones are
/// area-averaged down. Never enlarges.
pub fn display_image(image: &RgbImage, max_dim: u32) -> Cow<'_, RgbImage> {
    if image.width().max(image.height()) <= max_dim {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(resize_long_side(image, max_dim, Resample::Area))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn small_image_is_borrowed() {
        let img = RgbImage::from_pixel(800, 600, Rgb([1, 2, 3]));
        let shown = display_image(&img, DEFAULT_DISPLAY_MAX);
        assert!(matches!(shown, Cow::Borrowed(_)));
        assert!(std::ptr::eq(shown.as_ref(), &img));
    }

    #[test]
    fn large_image_is_reduced_keeping_aspect() {
        let img = RgbImage::from_pixel(2400, 1800, Rgb([9, 9, 9]));
        let shown = display_image(&img, DEFAULT_DISPLAY_MAX);
        assert!(matches!(shown, Cow::Owned(_)));
        assert_eq!(shown.dimensions(), (1200, 900));
    }

    #[test]
    fn scale_never_exceeds_one() {
        assert_eq!(display_scale(100, 50, 1200), 1.0);
        assert!((display_scale(2400, 1000, 1200) - 0.5).abs() < 1e-6);
        assert!((display_scale(1000, 3000, 1200) - 0.4).abs() < 1e-6);
    }
}
