// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel filters used by the enhancement chain.

pub mod contrast;
pub mod denoise;
mod lab;
pub mod sharpen;

pub use contrast::{clip_threshold, local_contrast};
pub use denoise::{denoise, search_window, template_window};
pub use sharpen::unsharp_mask;
