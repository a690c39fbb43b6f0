// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enhancement, detection and application configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RectifyError, Result};

/// Lower size-clamp factor relative to the reference dimension. Not user-tunable.
pub const MIN_SCALE_FACTOR: f32 = 0.75;

/// Accepted range for `EnhancementOptions::denoise_strength`.
pub const DENOISE_STRENGTH_RANGE: (f32, f32) = (5.0, 25.0);
/// Accepted range for `EnhancementOptions::clip_limit`.
pub const CLIP_LIMIT_RANGE: (f32, f32) = (1.0, 6.0);
/// Accepted range for `EnhancementOptions::sharpen_amount`.
pub const SHARPEN_AMOUNT_RANGE: (f32, f32) = (0.0, 3.0);
/// Accepted range for `EnhancementOptions::max_scale_factor`.
pub const MAX_SCALE_RANGE: (f32, f32) = (1.0, 2.0);

/// Which post-warp enhancements to apply, and how strongly.
///
/// Passed by value into every pipeline call. Parameters of a disabled stage
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementOptions {
    pub denoise: bool,
    /// Non-local-means filter strength `h`.
    pub denoise_strength: f32,
    /// Adaptive histogram equalisation of lightness (CLAHE).
    pub local_contrast: bool,
    pub clip_limit: f32,
    pub sharpen: bool,
    /// Unsharp-mask weight on the original; 1.0 leaves the image unchanged.
    pub sharpen_amount: f32,
    /// Gaussian sigma of the unsharp-mask blur.
    pub sharpen_sigma: f32,
    /// Keep the output near the source resolution.
    pub size_clamp: bool,
    pub max_scale_factor: f32,
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        Self {
            denoise: false,
            denoise_strength: 15.0,
            local_contrast: false,
            clip_limit: 3.0,
            sharpen: false,
            sharpen_amount: 1.8,
            sharpen_sigma: 5.0,
            size_clamp: true,
            max_scale_factor: 1.25,
        }
    }
}

impl EnhancementOptions {
    /// Every stage off, including the size clamp.
    pub fn disabled() -> Self {
        Self {
            size_clamp: false,
            ..Self::default()
        }
    }

    /// Check that every parameter is finite and within its range.
    pub fn validate(&self) -> Result<()> {
        check_range("denoise_strength", self.denoise_strength, DENOISE_STRENGTH_RANGE)?;
        check_range("clip_limit", self.clip_limit, CLIP_LIMIT_RANGE)?;
        check_range("sharpen_amount", self.sharpen_amount, SHARPEN_AMOUNT_RANGE)?;
        check_range("max_scale_factor", self.max_scale_factor, MAX_SCALE_RANGE)?;
        if !self.sharpen_sigma.is_finite() || self.sharpen_sigma <= 0.0 {
            return Err(RectifyError::InvalidConfig(format!(
                "sharpen_sigma must be positive, got {}",
                self.sharpen_sigma
            )));
        }
        Ok(())
    }

    /// True when no stage would touch the image.
    pub fn is_identity(&self) -> bool {
        !self.denoise && !self.local_contrast && !self.sharpen && !self.size_clamp
    }
}

fn check_range(name: &str, value: f32, (lo, hi): (f32, f32)) -> Result<()> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(RectifyError::InvalidConfig(format!(
            "{name} must be within [{lo}, {hi}], got {value}"
        )));
    }
    Ok(())
}

/// Tunables for automatic corner detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum fraction of the working image a candidate outline must cover.
    pub min_area_ratio: f32,
    /// Longest side of the working copy used for detection.
    pub downscale_limit: u32,
    /// Polygon simplification tolerance as a fraction of the perimeter.
    pub approx_epsilon_ratio: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.1,
            downscale_limit: 800,
            approx_epsilon_ratio: 0.02,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("min_area_ratio", self.min_area_ratio, (0.0, 1.0))?;
        check_range("approx_epsilon_ratio", self.approx_epsilon_ratio, (0.0, 1.0))?;
        if self.downscale_limit == 0 {
            return Err(RectifyError::InvalidConfig(
                "downscale_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Session-wide settings for the command-line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enhancement: EnhancementOptions,
    pub detection: DetectionConfig,
    /// Longest side of preview images.
    pub display_max_dim: u32,
    /// Appended to the input file stem when naming outputs.
    pub output_suffix: String,
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
    /// Quiet period before a preview re-render starts.
    pub preview_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementOptions::default(),
            detection: DetectionConfig::default(),
            display_max_dim: 1200,
            output_suffix: "_rectified".into(),
            jpeg_quality: 95,
            preview_debounce_ms: 200,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.enhancement.validate()?;
        self.detection.validate()?;
        if self.display_max_dim == 0 {
            return Err(RectifyError::InvalidConfig(
                "display_max_dim must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RectifyError::InvalidConfig(format!(
                "jpeg_quality must be within [1, 100], got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
