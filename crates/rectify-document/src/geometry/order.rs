// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner labelling from coordinate sums and differences.

use rectify_core::{CornerSet, Point, RectifyError, Result};

/// Label four points as top-left, top-right, bottom-right, bottom-left.
///
/// With `sum = x + y` and `diff = y - x`:
/// TL has the smallest sum, BR the largest sum, TR the smallest diff and
/// BL the largest diff. Ties go to the earliest input point.
///
/// The labelling is a pure function of the point set, so applying it to an
/// already ordered set returns the same set. It is reliable for documents
/// rotated less than about 45 degrees; beyond that, or for non-convex input,
/// two labels may land on the same point.
pub fn order_points(points: &[Point]) -> Result<CornerSet> {
    if points.len() != 4 {
        return Err(RectifyError::InvalidInput(format!(
            "expected 4 points, got {}",
            points.len()
        )));
    }
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(RectifyError::InvalidInput(format!(
            "point coordinates must be finite, got ({}, {})",
            bad.x, bad.y
        )));
    }

    let sums: Vec<f32> = points.iter().map(|p| p.x + p.y).collect();
    let diffs: Vec<f32> = points.iter().map(|p| p.y - p.x).collect();

    let tl = points[argmin(&sums)];
    let br = points[argmax(&sums)];
    let tr = points[argmin(&diffs)];
    let bl = points[argmax(&diffs)];

    CornerSet::new([tl, tr, br, bl])
}

/// Re-label an existing corner set. Idempotent on canonical input.
pub fn reorder(corners: &CornerSet) -> Result<CornerSet> {
    order_points(corners.points())
}

/// Index of the first minimum.
fn argmin(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v < values[best] {
            best = i;
        }
    }
    best
}

/// Index of the first maximum.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
