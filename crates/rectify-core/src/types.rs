// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Rectify document scanner.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RectifyError, Result};

/// A position in image pixel coordinates (x to the right, y downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Four document corners in canonical order: top-left, top-right,
/// bottom-right, bottom-left.
///
/// The constructors only check that coordinates are finite; labelling
/// arbitrary points is the job of `order_points` in `rectify-document`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet([Point; 4]);

impl CornerSet {
    /// Build from points already in TL, TR, BR, BL order.
    pub fn new(points: [Point; 4]) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(RectifyError::InvalidInput(format!(
                "corner coordinates must be finite, got ({}, {})",
                bad.x, bad.y
            )));
        }
        Ok(Self(points))
    }

    /// The whole image, `(0,0)` to `(w-1,h-1)`. Also the sentinel returned
    /// when corner detection fails.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let right = width.saturating_sub(1) as f32;
        let bottom = height.saturating_sub(1) as f32;
        Self([
            Point::new(0.0, 0.0),
            Point::new(right, 0.0),
            Point::new(right, bottom),
            Point::new(0.0, bottom),
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self(self.0.map(|p| Point::new(p.x * factor, p.y * factor)))
    }

    /// Control points in the tuple form the projective solver expects.
    pub fn as_tuples(&self) -> [(f32, f32); 4] {
        self.0.map(|p| (p.x, p.y))
    }

    /// Unsigned polygon area via the shoelace formula.
    pub fn area(&self) -> f32 {
        let mut twice = 0.0f32;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }

    /// True when no two non-adjacent edges cross (no "bow-tie").
    pub fn is_simple(&self) -> bool {
        let [tl, tr, br, bl] = self.0;
        !segments_cross(tl, tr, br, bl) && !segments_cross(tr, br, bl, tl)
    }

    /// Reject quadrilaterals that cannot describe a document: self-crossing
    /// outlines or an area below `min_area` square pixels.
    pub fn validate_geometry(&self, min_area: f32) -> Result<()> {
        if !self.is_simple() {
            return Err(RectifyError::DegenerateGeometry(
                "corner outline crosses itself".into(),
            ));
        }
        let area = self.area();
        if area < min_area {
            return Err(RectifyError::DegenerateGeometry(format!(
                "enclosed area {area:.1} px² is below the minimum of {min_area:.1} px²"
            )));
        }
        Ok(())
    }
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper intersection of segments `p1p2` and `p3p4` (touching does not count).
fn segments_cross(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Outcome of automatic corner detection.
///
/// When `success` is false, `corners` is the full-frame sentinel and the
/// caller should ask for manual corners rather than accept it silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub corners: CornerSet,
    pub success: bool,
}

impl DetectionResult {
    pub fn found(corners: CornerSet) -> Self {
        Self {
            corners,
            success: true,
        }
    }

    pub fn fallback(width: u32, height: u32) -> Self {
        Self {
            corners: CornerSet::full_frame(width, height),
            success: false,
        }
    }
}

/// Metadata captured at load time and re-embedded on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Raw EXIF payload as embedded in the source file.
    pub exif: Option<Vec<u8>>,
    /// Embedded ICC colour profile.
    pub icc_profile: Option<Vec<u8>>,
    /// EXIF orientation tag (1-8) found in the source; 1 when absent.
    pub orientation: u8,
}

impl Default for ImageMeta {
    fn default() -> Self {
        Self {
            exif: None,
            icc_profile: None,
            orientation: 1,
        }
    }
}

/// Image file formats accepted for input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportedFormat {
    Jpeg,
    Png,
    Tiff,
}

impl SupportedFormat {
    /// Every extension we accept, lower-case and without the dot.
    pub const EXTENSIONS: [&'static str; 5] = ["jpg", "jpeg", "png", "tiff", "tif"];

    /// Infer format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Infer format from a path's extension, failing with `UnsupportedFormat`.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| RectifyError::UnsupportedFormat(path.display().to_string()))
    }
}

/// Processing state of one file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Pending,
    Done,
    Error,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> CornerSet {
        CornerSet::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .expect("finite corners")
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        let mut pts = *square().points();
        pts[2].y = f32::NAN;
        assert!(matches!(
            CornerSet::new(pts),
            Err(RectifyError::InvalidInput(_))
        ));
        pts[2].y = f32::INFINITY;
        assert!(CornerSet::new(pts).is_err());
    }

    #[test]
    fn full_frame_spans_image() {
        let c = CornerSet::full_frame(640, 480);
        assert_eq!(c.top_left(), Point::new(0.0, 0.0));
        assert_eq!(c.top_right(), Point::new(639.0, 0.0));
        assert_eq!(c.bottom_right(), Point::new(639.0, 479.0));
        assert_eq!(c.bottom_left(), Point::new(0.0, 479.0));
    }

    #[test]
    fn shoelace_area_of_square() {
        assert!((square().area() - 100.0).abs() < 1e-4);
        assert!((square().scaled(2.0).area() - 400.0).abs() < 1e-3);
    }

    #[test]
    fn bow_tie_is_not_simple() {
        let c = CornerSet::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ])
        .expect("finite corners");
        assert!(!c.is_simple());
        assert!(matches!(
            c.validate_geometry(1.0),
            Err(RectifyError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn validate_geometry_checks_area() {
        assert!(square().validate_geometry(50.0).is_ok());
        assert!(square().validate_geometry(150.0).is_err());
        let collapsed = CornerSet::new([Point::new(5.0, 5.0); 4]).expect("finite corners");
        assert!(collapsed.validate_geometry(1.0).is_err());
    }

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(SupportedFormat::from_extension("JPG"), Some(SupportedFormat::Jpeg));
        assert_eq!(SupportedFormat::from_extension("Tif"), Some(SupportedFormat::Tiff));
        assert_eq!(SupportedFormat::from_extension("bmp"), None);
        assert!(SupportedFormat::from_path(Path::new("scan.PNG")).is_ok());
        assert!(matches!(
            SupportedFormat::from_path(Path::new("notes.txt")),
            Err(RectifyError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn detection_result_serializes() {
        let r = DetectionResult::fallback(4, 3);
        let json = serde_json::to_string(&r).expect("serialize");
        let back: DetectionResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, r);
        assert!(!back.success);
    }
}
