// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations and the argument types they share.

pub mod detect;
pub mod edit;
pub mod process;

use clap::Args;
use rectify_core::{CornerSet, EnhancementOptions, Point, RectifyError, Result};
use rectify_document::order_points;

/// Smallest area, in square pixels, accepted for hand-placed corners.
pub const MIN_CORNER_AREA: f32 = 100.0;

/// Enhancement flags shared by `process` and `edit`.
///
/// Flags only switch stages on; anything not given comes from the settings
/// file (or the defaults).
#[derive(Debug, Clone, Default, Args)]
pub struct EnhanceArgs {
    /// Non-local-means denoising.
    #[arg(long)]
    pub denoise: bool,

    /// Denoising strength (5-25).
    #[arg(long)]
    pub denoise_strength: Option<f32>,

    /// Local contrast equalisation on lightness.
    #[arg(long)]
    pub contrast: bool,

    /// Contrast clip limit (1-6).
    #[arg(long)]
    pub clip_limit: Option<f32>,

    /// Unsharp-mask sharpening.
    #[arg(long)]
    pub sharpen: bool,

    /// Sharpening amount (0-3; 1 leaves the image unchanged).
    #[arg(long)]
    pub sharpen_amount: Option<f32>,

    /// Sharpening blur sigma.
    #[arg(long)]
    pub sharpen_sigma: Option<f32>,

    /// Keep the output at whatever size the warp produced.
    #[arg(long)]
    pub no_clamp: bool,

    /// Largest allowed output, as a multiple of the source's longer side (1-2).
    #[arg(long)]
    pub max_scale: Option<f32>,

    /// Full enhancement options as a JSON string.
    ///
    /// When provided, all other enhancement flags are ignored.
    #[arg(long)]
    pub options_json: Option<String>,
}

impl EnhanceArgs {
    /// Combine the flags with `base` and validate the result.
    pub fn resolve(&self, base: EnhancementOptions) -> Result<EnhancementOptions> {
        let options = match &self.options_json {
            Some(json) => serde_json::from_str(json)?,
            None => {
                let mut o = base;
                o.denoise |= self.denoise;
                o.local_contrast |= self.contrast;
                o.sharpen |= self.sharpen;
                if self.no_clamp {
                    o.size_clamp = false;
                }
                o.denoise_strength = self.denoise_strength.unwrap_or(o.denoise_strength);
                o.clip_limit = self.clip_limit.unwrap_or(o.clip_limit);
                o.sharpen_amount = self.sharpen_amount.unwrap_or(o.sharpen_amount);
                o.sharpen_sigma = self.sharpen_sigma.unwrap_or(o.sharpen_sigma);
                o.max_scale_factor = self.max_scale.unwrap_or(o.max_scale_factor);
                o
            }
        };
        options.validate()?;
        Ok(options)
    }
}

/// Parse four hand-placed corners written as `"x,y x,y x,y x,y"`, in any
/// order. The points are labelled and checked for a usable outline.
pub fn parse_corners(text: &str) -> Result<CornerSet> {
    let points = text
        .split_whitespace()
        .map(parse_point)
        .collect::<Result<Vec<Point>>>()?;
    let corners = order_points(&points)?;
    corners.validate_geometry(MIN_CORNER_AREA)?;
    Ok(corners)
}

fn parse_point(pair: &str) -> Result<Point> {
    let invalid = || RectifyError::InvalidInput(format!("expected a corner as x,y, got {pair:?}"));
    let (x, y) = pair.split_once(',').ok_or_else(invalid)?;
    let x: f32 = x.trim().parse().map_err(|_| invalid())?;
    let y: f32 = y.trim().parse().map_err(|_| invalid())?;
    Ok(Point::new(x, y))
}
