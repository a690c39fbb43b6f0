// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: resampling, display copies, file I/O with metadata.

pub mod display;
pub mod exif;
pub mod io;
pub mod resample;

pub use display::{display_image, display_scale};
pub use io::{FsImageStore, ImageSink, ImageSource, output_path};
pub use resample::{Resample, clamp_bounds, clamp_size, resize_long_side};
