// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-warp enhancement chain: denoise, local contrast, sharpen, size clamp.

use image::RgbImage;
use rectify_core::EnhancementOptions;
use rectify_core::config::MIN_SCALE_FACTOR;
use tracing::{debug, info, instrument};

use crate::filter::{denoise, local_contrast, unsharp_mask};
use crate::image::resample;

/// Enhances a rectified document image.
///
/// Each method consumes `self` and returns the transformed enhancer, so
/// stages chain:
///
/// ```ignore
/// let page = ScanEnhancer::new(warped)
///     .denoise(15.0)
///     .local_contrast(3.0)
///     .sharpen(1.8, 5.0)
///     .clamp_size(2000, 1.25, 0.75)
///     .into_image();
/// ```
///
/// [`ScanEnhancer::apply`] runs the stages selected by an
/// [`EnhancementOptions`] in the fixed order above.
pub struct ScanEnhancer {
    image: RgbImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    // -- Stages ---------------------------------------------------------------

    /// Non-local-means denoising with filter strength `strength`.
    pub fn denoise(self, strength: f32) -> Self {
        debug!(strength, "Denoising");
        Self {
            image: denoise(&self.image, strength),
        }
    }

    /// CLAHE on lightness with the given clip limit.
    pub fn local_contrast(self, clip_limit: f32) -> Self {
        debug!(clip_limit, "Equalising local contrast");
        Self {
            image: local_contrast(&self.image, clip_limit),
        }
    }

    /// Unsharp mask: `amount * image + (1 - amount) * blur(image, sigma)`.
    pub fn sharpen(self, amount: f32, sigma: f32) -> Self {
        debug!(amount, sigma, "Sharpening");
        Self {
            image: unsharp_mask(&self.image, amount, sigma),
        }
    }

    /// Keep the longer side within `[reference * min_factor, reference * max_factor]`.
    pub fn clamp_size(self, reference: u32, max_factor: f32, min_factor: f32) -> Self {
        Self {
            image: resample::clamp_size(self.image, reference, max_factor, min_factor),
        }
    }

    // -- Chain ----------------------------------------------------------------

    /// Run the enabled stages in order. `reference` is the longer side of
    /// the original (pre-warp) image and only matters for the size clamp.
    #[instrument(skip(self, options), fields(width = self.image.width(), height = self.image.height()))]
    pub fn apply(self, options: &EnhancementOptions, reference: u32) -> Self {
        if options.is_identity() {
            debug!("Every stage disabled; image passed through");
            return self;
        }
        let mut stage = self;
        if options.denoise {
            stage = stage.denoise(options.denoise_strength);
        }
        if options.local_contrast {
            stage = stage.local_contrast(options.clip_limit);
        }
        if options.sharpen {
            stage = stage.sharpen(options.sharpen_amount, options.sharpen_sigma);
        }
        if options.size_clamp {
            stage = stage.clamp_size(reference, options.max_scale_factor, MIN_SCALE_FACTOR);
        }
        info!(
            width = stage.image.width(),
            height = stage.image.height(),
            denoise = options.denoise,
            local_contrast = options.local_contrast,
            sharpen = options.sharpen,
            size_clamp = options.size_clamp,
            "Enhancement chain complete"
        );
        stage
    }
}
