// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unsharp masking.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::instrument;

/// Blend the image with a Gaussian-blurred copy:
/// `amount * original + (1 - amount) * blurred`, rounded and clamped.
///
/// `amount > 1` sharpens, `amount = 1` returns the input unchanged and
/// `amount < 1` softens. The blur runs in floating point so flat regions
/// stay exactly flat.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn unsharp_mask(image: &RgbImage, amount: f32, sigma: f32) -> RgbImage {
    if image.width() == 0 || image.height() == 0 || sigma <= 0.0 {
        return image.clone();
    }

    let original = DynamicImage::ImageRgb8(image.clone()).to_rgb32f();
    let blurred = gaussian_blur_f32(&original, sigma);
    let keep = 1.0 - amount;

    let mut out = RgbImage::new(image.width(), image.height());
    for ((dst, src), blur) in out.pixels_mut().zip(original.pixels()).zip(blurred.pixels()) {
        let mix = |c: usize| {
            let v = amount * src.0[c] + keep * blur.0[c];
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };
        *dst = Rgb([mix(0), mix(1), mix(2)]);
    }
    out
}
