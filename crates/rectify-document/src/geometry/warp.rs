// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective warp of a corner quadrilateral onto an upright rectangle.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rectify_core::{CornerSet, RectifyError, Result};
use tracing::{debug, instrument, warn};

use crate::geometry::order::reorder;

/// Quadrilaterals enclosing less than this many square pixels are treated
/// as collapsed.
const MIN_WARP_AREA: f32 = 0.5;

/// How far outside the source a corner may lie, in multiples of the image
/// extent. The output is sized from the corners, so this bounds the
/// allocation.
const MAX_OUTSIDE_EXTENT: f32 = 1.0;

/// Output dimensions for a corner set: the longer of each pair of opposite
/// edges, truncated to whole pixels, never below 1x1.
pub fn output_size(corners: &CornerSet) -> (u32, u32) {
    let (tl, tr, br, bl) = (
        corners.top_left(),
        corners.top_right(),
        corners.bottom_right(),
        corners.bottom_left(),
    );
    let width_bottom = br.distance(&bl) as u32;
    let width_top = tr.distance(&tl) as u32;
    let height_right = tr.distance(&br) as u32;
    let height_left = tl.distance(&bl) as u32;

    (
        width_bottom.max(width_top).max(1),
        height_right.max(height_left).max(1),
    )
}

/// Reject corners lying more than one image extent outside `image`.
pub fn check_reach(image: &RgbImage, corners: &CornerSet) -> Result<()> {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let (slack_x, slack_y) = (w * MAX_OUTSIDE_EXTENT, h * MAX_OUTSIDE_EXTENT);
    for p in corners.points() {
        let inside_x = (-slack_x..=w + slack_x).contains(&p.x);
        let inside_y = (-slack_y..=h + slack_y).contains(&p.y);
        if !(inside_x && inside_y) {
            return Err(RectifyError::DegenerateGeometry(format!(
                "corner ({}, {}) lies too far outside the {}x{} image",
                p.x,
                p.y,
                image.width(),
                image.height()
            )));
        }
    }
    Ok(())
}

/// Map the quadrilateral inside `image` to a rectangle.
///
/// Corners are re-labelled before use, so any order is accepted. Pixels
/// that sample outside the source come out black. A collapsed quadrilateral
/// has no projective solution; the result is then an all-black buffer of
/// the computed size and a warning is logged. Corners further than one
/// image extent outside the source are rejected before anything is
/// allocated.
#[instrument(skip(image, corners), fields(width = image.width(), height = image.height()))]
pub fn warp_perspective(image: &RgbImage, corners: &CornerSet) -> Result<RgbImage> {
    check_reach(image, corners)?;
    let corners = reorder(corners)?;
    let (out_w, out_h) = output_size(&corners);

    let right = (out_w - 1) as f32;
    let bottom = (out_h - 1) as f32;
    let dest: [(f32, f32); 4] = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    let black = Rgb([0u8, 0, 0]);
    let mut output = RgbImage::from_pixel(out_w, out_h, black);

    let projection = if corners.area() < MIN_WARP_AREA {
        None
    } else {
        Projection::from_control_points(corners.as_tuples(), dest)
    };
    let Some(projection) = projection else {
        warn!(
            out_w,
            out_h,
            area = corners.area(),
            "Corner quadrilateral is degenerate; returning blank output"
        );
        return Ok(output);
    };

    warp_into(image, &projection, Interpolation::Bilinear, black, &mut output);

    debug!(out_w, out_h, "Perspective warp applied");
    Ok(output)
}
