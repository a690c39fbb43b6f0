// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end run: warp the corner quadrilateral, then enhance.

use image::RgbImage;
use rectify_core::{CornerSet, EnhancementOptions, Result};
use tracing::{info, instrument};

use crate::geometry::warp::warp_perspective;
use crate::scan::enhance::ScanEnhancer;

/// Warp `image` by `corners` and apply the enabled enhancements.
///
/// The size clamp is measured against the longer side of the source image.
/// Options are validated first; out-of-range values fail with
/// `InvalidConfig` before any pixel work.
#[instrument(skip(image, corners, options), fields(width = image.width(), height = image.height()))]
pub fn full_pipeline(
    image: &RgbImage,
    corners: &CornerSet,
    options: EnhancementOptions,
) -> Result<RgbImage> {
    let reference = image.width().max(image.height());
    full_pipeline_with_reference(image, corners, options, reference)
}

/// [`full_pipeline`] with an explicit reference dimension for the size clamp.
pub fn full_pipeline_with_reference(
    image: &RgbImage,
    corners: &CornerSet,
    options: EnhancementOptions,
    reference: u32,
) -> Result<RgbImage> {
    options.validate()?;

    let warped = warp_perspective(image, corners)?;
    info!(
        warped_w = warped.width(),
        warped_h = warped.height(),
        reference,
        "Document rectified"
    );

    Ok(ScanEnhancer::new(warped).apply(&options, reference).into_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::warp::output_size;
    use crate::image::display::display_image;
    use crate::scan::detect::detect_corners_default;
    use image::Rgb;
    use rectify_core::{Point, RectifyError};

    fn corners(pts: [(f32, f32); 4]) -> CornerSet {
        CornerSet::new(pts.map(Point::from)).expect("finite corners")
    }

    fn photo(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 251) as u8, (y % 241) as u8, 100]))
    }

    /// A 2000x1500 photo with a tilted page: warped size follows the longer
    /// edges and the clamp leaves it alone (within 1500..=2500).
    #[test]
    fn tilted_page_keeps_warped_size() {
        let img = photo(2000, 1500);
        let c = corners([(100.0, 80.0), (1900.0, 120.0), (1850.0, 1400.0), (150.0, 1380.0)]);
        let expected = output_size(&c);
        assert_eq!(expected, (1800, 1300));

        let out = full_pipeline(&img, &c, EnhancementOptions::default()).expect("pipeline");
        assert_eq!(out.dimensions(), expected);
    }

    #[test]
    fn invalid_options_rejected_before_work() {
        let img = photo(20, 20);
        let options = EnhancementOptions {
            max_scale_factor: 5.0,
            ..EnhancementOptions::default()
        };
        let err = full_pipeline(&img, &CornerSet::full_frame(20, 20), options)
            .expect_err("out of range");
        assert!(matches!(err, RectifyError::InvalidConfig(_)));
    }

    #[test]
    fn small_crop_is_enlarged_to_lower_bound() {
        let img = photo(1000, 800);
        let c = corners([(0.0, 0.0), (400.0, 0.0), (400.0, 300.0), (0.0, 300.0)]);
        let out = full_pipeline(&img, &c, EnhancementOptions::default()).expect("pipeline");
        // reference 1000 -> lower bound 750 on the longer side
        assert_eq!(out.dimensions(), (750, 562));
    }

    #[test]
    fn explicit_reference_drives_clamp() {
        let img = photo(300, 300);
        let c = CornerSet::full_frame(300, 300);
        let out = full_pipeline_with_reference(&img, &c, EnhancementOptions::default(), 200)
            .expect("pipeline");
        assert_eq!(out.dimensions(), (250, 250));
    }

    /// A skewed light page on a dark 2000x1500 photo: detection runs on the
    /// reduced copy, the corners map back close to the drawn ones, and the
    /// enhanced result stays within the clamp window.
    #[test]
    fn skewed_page_detected_warped_and_enhanced() {
        let drawn = [(100.0, 80.0), (1900.0, 120.0), (1850.0, 1400.0), (150.0, 1380.0)];
        let mut img = RgbImage::from_pixel(2000, 1500, Rgb([35, 40, 45]));
        let poly: Vec<imageproc::point::Point<i32>> = drawn
            .iter()
            .map(|&(x, y)| imageproc::point::Point::new(x as i32, y as i32))
            .collect();
        imageproc::drawing::draw_polygon_mut(&mut img, &poly, Rgb([235, 232, 225]));

        let detection = detect_corners_default(&img);
        assert!(detection.success);
        for (got, want) in detection.corners.points().iter().zip(drawn) {
            let d = got.distance(&Point::from(want));
            assert!(d <= 6.0, "corner {got:?} is {d:.1}px from {want:?}");
        }

        // Exact corners give 1800x1300.
        let (w, h) = output_size(&detection.corners);
        assert!((1780..=1810).contains(&w), "warp width {w}");
        assert!((1280..=1310).contains(&h), "warp height {h}");

        let options = EnhancementOptions {
            denoise: false,
            local_contrast: true,
            clip_limit: 3.0,
            sharpen: true,
            sharpen_amount: 1.8,
            size_clamp: true,
            max_scale_factor: 1.25,
            ..EnhancementOptions::default()
        };
        let out = full_pipeline(&img, &detection.corners, options).expect("pipeline");
        let longest = out.width().max(out.height());
        assert!((1500..=2500).contains(&longest), "final {longest}");
    }

    /// Detect, correct, and preview a synthetic photo in one pass.
    #[test]
    fn detect_then_rectify() {
        let mut img = RgbImage::from_pixel(600, 450, Rgb([30, 30, 30]));
        imageproc::drawing::draw_polygon_mut(
            &mut img,
            &[
                imageproc::point::Point::new(60, 50),
                imageproc::point::Point::new(540, 70),
                imageproc::point::Point::new(530, 400),
                imageproc::point::Point::new(70, 390),
            ],
            Rgb([240, 240, 240]),
        );
        let detection = detect_corners_default(&img);
        assert!(detection.success);

        let options = EnhancementOptions {
            local_contrast: true,
            sharpen: true,
            ..EnhancementOptions::default()
        };
        let out = full_pipeline(&img, &detection.corners, options).expect("pipeline");
        let (w, h) = out.dimensions();
        assert!(w.max(h) >= 450 && w.max(h) <= 750, "got {w}x{h}");
        assert!(w > h, "landscape page stays landscape");

        // The page interior is bright after correction.
        let centre = out.get_pixel(w / 2, h / 2).0;
        assert!(centre.iter().all(|&c| c > 180), "centre {centre:?}");

        let preview = display_image(&out, 1200);
        assert_eq!(preview.dimensions(), out.dimensions());
    }
}
