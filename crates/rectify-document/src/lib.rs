// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rectify-document: Perspective correction for photographed documents.
//
// Provides corner labelling and automatic corner detection, the projective
// warp, an enhancement chain (denoise, local contrast, sharpen, size clamp),
// preview scaling, and metadata-preserving image file I/O.

pub mod filter;
pub mod geometry;
pub mod image;
pub mod scan;

// Re-export the primary entry points so callers can use `rectify_document::full_pipeline` etc.
pub use geometry::order::order_points;
pub use geometry::warp::{output_size, warp_perspective};
pub use self::image::display::{display_image, display_scale};
pub use self::image::io::{FsImageStore, ImageSink, ImageSource, output_path};
pub use scan::detect::{detect_corners, detect_corners_default};
pub use scan::enhance::ScanEnhancer;
pub use scan::pipeline::{full_pipeline, full_pipeline_with_reference};
