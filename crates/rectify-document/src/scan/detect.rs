// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic document corner detection.
//
// Edges are found on a reduced working copy, thickened so the page outline
// closes, traced as outer contours, and simplified. The largest contour that
// simplifies to a quadrilateral is taken as the page. Its sides are then
// refitted to the undilated edge pixels so the corners sit on the page
// boundary rather than on the outside of the thickened band.

use image::{GrayImage, RgbImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use rectify_core::{DetectionConfig, DetectionResult, Point};
use tracing::{debug, info, instrument};

use crate::geometry::lines::Line;
use crate::geometry::order::order_points;
use crate::geometry::simplify::{closed_perimeter, polygon_area, simplify_closed};
use crate::image::resample::{Resample, resize_long_side};

/// Pre-blur sigma (matches a 5x5 Gaussian kernel).
pub const BLUR_SIGMA: f32 = 1.1;
/// Canny hysteresis thresholds.
pub const CANNY_LOW: f32 = 75.0;
pub const CANNY_HIGH: f32 = 200.0;
/// Square dilation radius; 3x3 applied twice.
pub const DILATE_RADIUS: u8 = 2;

/// Edge maps need at least this many pixels per side.
const MIN_SIDE: u32 = 3;

/// Half-width of the band around each traced side searched for edge pixels.
const EDGE_BAND: f32 = DILATE_RADIUS as f32 + 4.0;
/// Half-width kept around the first fit before refitting.
const INLIER_BAND: f32 = 2.0;
/// Share of each side skipped at both ends, where the corners round off.
const SIDE_TRIM: f32 = 0.15;
/// Fewest edge pixels a side needs before a line is fitted to it.
const MIN_SIDE_SAMPLES: usize = 5;
/// Refined corners further than this from the traced ones are discarded.
const MAX_REFINE_SHIFT: f32 = 3.0 * EDGE_BAND;

/// Detect the page quadrilateral in `image`.
///
/// Never fails: when nothing usable is found the result carries the
/// full-frame corners and `success == false`.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn detect_corners(image: &RgbImage, config: &DetectionConfig) -> DetectionResult {
    let (w, h) = image.dimensions();
    let fallback = DetectionResult::fallback(w, h);

    let long = w.max(h);
    let limit = config.downscale_limit.max(1);
    let (working, scale) = if long > limit {
        let resized = resize_long_side(image, limit, Resample::Linear);
        (resized, limit as f32 / long as f32)
    } else {
        (image.clone(), 1.0)
    };
    let (ws, hs) = working.dimensions();
    if ws < MIN_SIDE || hs < MIN_SIDE {
        debug!(ws, hs, "Image too small for edge detection");
        info!(success = false, "No document outline found");
        return fallback;
    }

    let gray = imageops::grayscale(&working);
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
    let closed = dilate(&edges, Norm::LInf, DILATE_RADIUS);

    let mut outlines: Vec<(f32, Vec<Point>)> = find_contours::<i32>(&closed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            let pts: Vec<Point> = c
                .points
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect();
            (polygon_area(&pts), pts)
        })
        .collect();
    outlines.sort_by(|a, b| b.0.total_cmp(&a.0));
    debug!(scale, candidates = outlines.len(), "Outer contours traced");

    let min_area = config.min_area_ratio * ws as f32 * hs as f32;
    for (area, outline) in &outlines {
        if *area < min_area {
            continue;
        }
        let epsilon = config.approx_epsilon_ratio * closed_perimeter(outline);
        let polygon = simplify_closed(outline, epsilon);
        debug!(area, vertices = polygon.len(), "Candidate simplified");
        if polygon.len() != 4 {
            continue;
        }

        let vertices = refine_corners(&edges, &polygon).unwrap_or_else(|| {
            debug!("Edge refit rejected; keeping traced corners");
            polygon
        });
        if let Ok(corners) = order_points(&vertices).map(|c| c.scaled(1.0 / scale)) {
            info!(
                success = true,
                tl = ?corners.top_left(),
                br = ?corners.bottom_right(),
                "Document outline found"
            );
            return DetectionResult::found(corners);
        }
    }

    info!(success = false, "No document outline found");
    fallback
}

/// Move each vertex of `polygon` (working-copy coordinates, ring order) to
/// the crossing of lines fitted to the raw edge pixels along its two sides.
/// `None` when a side has too few edge pixels or a corner would move
/// implausibly far.
fn refine_corners(edges: &GrayImage, polygon: &[Point]) -> Option<Vec<Point>> {
    let n = polygon.len();
    let sides = (0..n)
        .map(|k| fit_side(edges, polygon[k], polygon[(k + 1) % n]))
        .collect::<Option<Vec<Line>>>()?;

    let mut refined = Vec::with_capacity(n);
    for k in 0..n {
        let vertex = sides[(k + n - 1) % n].intersect(&sides[k])?;
        if vertex.distance(&polygon[k]) > MAX_REFINE_SHIFT {
            return None;
        }
        refined.push(vertex);
    }
    Some(refined)
}

/// Fit a line to the edge pixels near the middle stretch of the side `a`-`b`.
fn fit_side(edges: &GrayImage, a: Point, b: Point) -> Option<Line> {
    let traced = Line::through(a, b)?;
    let len = a.distance(&b);
    let trim = (len * SIDE_TRIM).max(EDGE_BAND + 2.0);
    if len <= 2.0 * trim {
        return None;
    }
    let (ux, uy) = ((b.x - a.x) / len, (b.y - a.y) / len);

    let (w, h) = edges.dimensions();
    let x0 = (a.x.min(b.x) - EDGE_BAND).floor().max(0.0) as u32;
    let y0 = (a.y.min(b.y) - EDGE_BAND).floor().max(0.0) as u32;
    let x1 = ((a.x.max(b.x) + EDGE_BAND).ceil().max(0.0) as u32).min(w - 1);
    let y1 = ((a.y.max(b.y) + EDGE_BAND).ceil().max(0.0) as u32).min(h - 1);

    let mut samples = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if edges.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            let p = Point::new(x as f32, y as f32);
            let along = (p.x - a.x) * ux + (p.y - a.y) * uy;
            if (trim..=len - trim).contains(&along) && traced.distance(p).abs() <= EDGE_BAND {
                samples.push(p);
            }
        }
    }
    if samples.len() < MIN_SIDE_SAMPLES {
        return None;
    }

    let first = Line::fit(&samples)?;
    let inliers: Vec<Point> = samples
        .into_iter()
        .filter(|p| first.distance(*p).abs() <= INLIER_BAND)
        .collect();
    if inliers.len() < MIN_SIDE_SAMPLES {
        return Some(first);
    }
    Line::fit(&inliers)
}

/// `detect_corners` with default tunables.
pub fn detect_corners_default(image: &RgbImage) -> DetectionResult {
    detect_corners(image, &DetectionConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point as PixelPoint;
    use rectify_core::CornerSet;

    /// Bright quadrilateral on a dark background.
    fn page_on_desk(w: u32, h: u32, quad: [(i32, i32); 4]) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, Rgb([35, 40, 45]));
        let poly: Vec<PixelPoint<i32>> =
            quad.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect();
        draw_polygon_mut(&mut img, &poly, Rgb([235, 232, 225]));
        img
    }

    fn assert_close(found: &CornerSet, expected: [(f32, f32); 4], tol: f32) {
        for (got, want) in found.points().iter().zip(expected) {
            let d = got.distance(&Point::new(want.0, want.1));
            assert!(d <= tol, "corner {got:?} is {d:.1}px from {want:?}");
        }
    }

    #[test]
    fn finds_tilted_page() {
        let quad = [(80, 60), (520, 90), (500, 420), (100, 400)];
        let img = page_on_desk(640, 480, quad);
        let result = detect_corners_default(&img);
        assert!(result.success);
        assert_close(
            &result.corners,
            [(80.0, 60.0), (520.0, 90.0), (500.0, 420.0), (100.0, 400.0)],
            15.0,
        );
    }

    /// Large inputs are detected on a reduced copy and mapped back.
    #[test]
    fn finds_page_after_downscale() {
        let quad = [(150, 100), (1450, 160), (1400, 1100), (180, 1050)];
        let img = page_on_desk(1600, 1200, quad);
        let result = detect_corners_default(&img);
        assert!(result.success);
        assert_close(
            &result.corners,
            [(150.0, 100.0), (1450.0, 160.0), (1400.0, 1100.0), (180.0, 1050.0)],
            15.0,
        );
    }

    /// Without downscaling the refit puts corners within a couple of pixels
    /// of the drawn page, not on the outside of the dilated band.
    #[test]
    fn corners_sit_on_page_boundary() {
        let quad = [(80, 60), (520, 90), (500, 420), (100, 400)];
        let img = page_on_desk(640, 480, quad);
        let result = detect_corners_default(&img);
        assert!(result.success);
        assert_close(
            &result.corners,
            [(80.0, 60.0), (520.0, 90.0), (500.0, 420.0), (100.0, 400.0)],
            4.0,
        );
    }

    /// A one-pixel rectangle outline with a traced polygon three pixels
    /// outside it: the refit lands on the outline's corners.
    #[test]
    fn refit_snaps_to_edge_pixels() {
        let mut edges = GrayImage::new(100, 100);
        for i in 20..=80 {
            for (x, y) in [(i, 20), (i, 80), (20, i), (80, i)] {
                edges.put_pixel(x, y, image::Luma([255]));
            }
        }
        let traced = [
            Point::new(17.0, 17.0),
            Point::new(83.0, 17.0),
            Point::new(83.0, 83.0),
            Point::new(17.0, 83.0),
        ];
        let refined = refine_corners(&edges, &traced).expect("refit");
        let expected = [(20.0, 20.0), (80.0, 20.0), (80.0, 80.0), (20.0, 80.0)];
        for (got, want) in refined.iter().zip(expected) {
            assert!(got.distance(&Point::new(want.0, want.1)) < 0.5, "{got:?}");
        }
    }

    #[test]
    fn refit_gives_up_without_edge_pixels() {
        let edges = GrayImage::new(100, 100);
        let traced = [
            Point::new(17.0, 17.0),
            Point::new(83.0, 17.0),
            Point::new(83.0, 83.0),
            Point::new(17.0, 83.0),
        ];
        assert!(refine_corners(&edges, &traced).is_none());
    }

    #[test]
    fn blank_image_falls_back() {
        let img = RgbImage::from_pixel(300, 200, Rgb([128, 128, 128]));
        let result = detect_corners_default(&img);
        assert!(!result.success);
        assert_eq!(result.corners, CornerSet::full_frame(300, 200));
    }

    /// A shape far below the area threshold is skipped.
    #[test]
    fn small_shapes_are_ignored() {
        let img = page_on_desk(400, 400, [(180, 180), (220, 180), (220, 220), (180, 220)]);
        let result = detect_corners_default(&img);
        assert!(!result.success);
        assert_eq!(result.corners, CornerSet::full_frame(400, 400));
    }

    #[test]
    fn tiny_images_fall_back() {
        for (w, h) in [(1, 1), (2, 50), (50, 2)] {
            let img = RgbImage::from_pixel(w, h, Rgb([0, 0, 0]));
            let result = detect_corners_default(&img);
            assert!(!result.success);
            assert_eq!(result.corners, CornerSet::full_frame(w, h));
        }
    }
}
