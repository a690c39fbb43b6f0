// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Non-local-means colour denoising.
//
// The image is split into lightness and a joint chroma pair. Each pixel is
// replaced by a weighted mean of the pixels in its search window, weighted
// by how similar their surrounding patches are. Patch distances for one
// search offset are read from an integral image of squared differences, so
// the cost per offset is constant in the patch size.

use image::RgbImage;
use tracing::{debug, instrument};

use super::lab::LabPlanes;

/// Lightness is stored in [0, 100]; distances are judged on a 0-255 scale.
const LIGHTNESS_TO_8BIT: f32 = 255.0 / 100.0;

/// Patch side length for a given filter strength, clamped to 3..=7.
pub fn template_window(strength: f32) -> u32 {
    (strength.max(0.0) as u32).clamp(3, 7)
}

/// Search window side length: twice the patch side plus one.
pub fn search_window(strength: f32) -> u32 {
    2 * template_window(strength) + 1
}

/// Denoise with filter strength `strength` applied to both lightness and
/// colour.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn denoise(image: &RgbImage, strength: f32) -> RgbImage {
    if strength <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let template_radius = template_window(strength) / 2;
    let search_radius = search_window(strength) / 2;
    debug!(strength, template_radius, search_radius, "Non-local means");

    let mut planes = LabPlanes::from_rgb(image);
    let (w, h) = (planes.width as usize, planes.height as usize);
    let window = Window {
        template_radius: template_radius as usize,
        search_radius: search_radius as usize,
    };

    let lightness = denoise_planes(&[&planes.l], w, h, window, strength / LIGHTNESS_TO_8BIT);
    let chroma = denoise_planes(&[&planes.a, &planes.b], w, h, window, strength);

    if let Some(l) = lightness.into_iter().next() {
        planes.l = l;
    }
    let mut chroma = chroma.into_iter();
    if let (Some(a), Some(b)) = (chroma.next(), chroma.next()) {
        planes.a = a;
        planes.b = b;
    }

    planes.to_rgb()
}

#[derive(Debug, Clone, Copy)]
struct Window {
    template_radius: usize,
    search_radius: usize,
}

/// Edge-replicated copy of a set of planes.
struct Padded {
    stride: usize,
    pad: usize,
    planes: Vec<Vec<f32>>,
}

impl Padded {
    fn new(planes: &[&Vec<f32>], w: usize, h: usize, pad: usize) -> Self {
        let stride = w + 2 * pad;
        let rows = h + 2 * pad;
        let planes = planes
            .iter()
            .map(|plane| {
                let mut out = Vec::with_capacity(stride * rows);
                for py in 0..rows {
                    let sy = py.saturating_sub(pad).min(h - 1);
                    for px in 0..stride {
                        let sx = px.saturating_sub(pad).min(w - 1);
                        out.push(plane[sy * w + sx]);
                    }
                }
                out
            })
            .collect();
        Self { stride, pad, planes }
    }

    #[inline]
    fn at(&self, c: usize, x: usize, y: usize) -> f32 {
        self.planes[c][y * self.stride + x]
    }
}

/// Filter planes that share one weight map (`h` is the decay parameter).
fn denoise_planes(
    planes: &[&Vec<f32>],
    w: usize,
    h: usize,
    window: Window,
    h_param: f32,
) -> Vec<Vec<f32>> {
    let channels = planes.len();
    let tr = window.template_radius;
    let sr = window.search_radius;
    let padded = Padded::new(planes, w, h, tr + sr);
    let pad = padded.pad;

    let inv_h2 = 1.0 / (h_param * h_param);
    let patch_area = ((2 * tr + 1) * (2 * tr + 1)) as f64;
    let norm = 1.0 / (patch_area * channels as f64);

    // Squared differences are needed for every pixel plus a template border.
    let dw = w + 2 * tr;
    let dh = h + 2 * tr;
    let istride = dw + 1;
    let mut integral = vec![0f64; istride * (dh + 1)];

    let mut sums = vec![vec![0f32; w * h]; channels];
    let mut weights = vec![0f32; w * h];

    for dy in -(sr as isize)..=(sr as isize) {
        for dx in -(sr as isize)..=(sr as isize) {
            // Integral of squared differences between the image and its shift.
            for iy in 0..dh {
                let y = iy + pad - tr;
                let ys = (y as isize + dy) as usize;
                let mut row = 0f64;
                for ix in 0..dw {
                    let x = ix + pad - tr;
                    let xs = (x as isize + dx) as usize;
                    let mut d2 = 0f32;
                    for c in 0..channels {
                        let diff = padded.at(c, x, y) - padded.at(c, xs, ys);
                        d2 += diff * diff;
                    }
                    row += f64::from(d2);
                    integral[(iy + 1) * istride + ix + 1] = integral[iy * istride + ix + 1] + row;
                }
            }

            let side = 2 * tr + 1;
            for y in 0..h {
                for x in 0..w {
                    let (x1, y1) = (x + side, y + side);
                    let patch = integral[y1 * istride + x1] - integral[y * istride + x1]
                        - integral[y1 * istride + x]
                        + integral[y * istride + x];
                    let d2 = (patch * norm) as f32;
                    let weight = (-d2.max(0.0) * inv_h2).exp();

                    let sx = (x + pad) as isize + dx;
                    let sy = (y + pad) as isize + dy;
                    let i = y * w + x;
                    weights[i] += weight;
                    for (c, sum) in sums.iter_mut().enumerate() {
                        sum[i] += weight * padded.at(c, sx as usize, sy as usize);
                    }
                }
            }
        }
    }

    // The zero offset always contributes weight 1, so no division by zero.
    for sum in &mut sums {
        for (v, wsum) in sum.iter_mut().zip(&weights) {
            *v /= *wsum;
        }
    }
    sums
}
