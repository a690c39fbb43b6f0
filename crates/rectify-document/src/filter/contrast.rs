// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalisation (CLAHE) on lightness.

use image::RgbImage;
use tracing::{debug, instrument};

use super::lab::LabPlanes;

/// Tiles per axis.
pub const TILE_GRID: u32 = 8;

const BINS: usize = 256;
const LIGHTNESS_TO_8BIT: f32 = 255.0 / 100.0;

/// Per-bin histogram ceiling for a tile holding `tile_area` pixels.
pub fn clip_threshold(clip_limit: f32, tile_area: usize) -> u32 {
    ((clip_limit * tile_area as f32 / BINS as f32) as u32).max(1)
}

/// Equalise lightness tile by tile, leaving colour (a*, b*) untouched.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn local_contrast(image: &RgbImage, clip_limit: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let mut planes = LabPlanes::from_rgb(image);
    let lightness: Vec<u8> = planes
        .l
        .iter()
        .map(|l| (l * LIGHTNESS_TO_8BIT).round().clamp(0.0, 255.0) as u8)
        .collect();

    let equalised = clahe(&lightness, w as usize, h as usize, clip_limit);
    planes.l = equalised.iter().map(|v| v / LIGHTNESS_TO_8BIT).collect();

    planes.to_rgb()
}

/// Tile layout: `count` tiles of `size` pixels, the last absorbing the remainder.
#[derive(Debug, Clone, Copy)]
struct Tiles {
    count: usize,
    size: usize,
}

impl Tiles {
    fn along(len: usize) -> Self {
        let count = (TILE_GRID as usize).min(len).max(1);
        Self {
            count,
            size: len / count,
        }
    }

    fn span(&self, index: usize, len: usize) -> (usize, usize) {
        let start = index * self.size;
        let end = if index + 1 == self.count { len } else { start + self.size };
        (start, end)
    }
}

fn clahe(lum: &[u8], w: usize, h: usize, clip_limit: f32) -> Vec<f32> {
    let tiles_x = Tiles::along(w);
    let tiles_y = Tiles::along(h);

    let mut luts = vec![[0f32; BINS]; tiles_x.count * tiles_y.count];
    for ty in 0..tiles_y.count {
        let (y0, y1) = tiles_y.span(ty, h);
        for tx in 0..tiles_x.count {
            let (x0, x1) = tiles_x.span(tx, w);
            let mut hist = [0u32; BINS];
            for row in y0..y1 {
                for &v in &lum[row * w + x0..row * w + x1] {
                    hist[v as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts[ty * tiles_x.count + tx] = tile_lut(&mut hist, area, clip_limit);
        }
    }
    debug!(tiles_x = tiles_x.count, tiles_y = tiles_y.count, "Tile LUTs built");

    // Blend the four surrounding tile mappings for every pixel.
    let inv_tw = 1.0 / tiles_x.size as f32;
    let inv_th = 1.0 / tiles_y.size as f32;
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        let (ty1, ty2, ya) = neighbours(y as f32 * inv_th - 0.5, tiles_y.count);
        for x in 0..w {
            let (tx1, tx2, xa) = neighbours(x as f32 * inv_tw - 0.5, tiles_x.count);
            let v = lum[y * w + x] as usize;
            let lut = |ty: usize, tx: usize| luts[ty * tiles_x.count + tx][v];

            let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
            let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
            out.push(top * (1.0 - ya) + bottom * ya);
        }
    }
    out
}

/// Clip the histogram, spread the excess evenly, and turn it into a mapping.
fn tile_lut(hist: &mut [u32; BINS], area: usize, clip_limit: f32) -> [f32; BINS] {
    let clip = clip_threshold(clip_limit, area);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0f32; BINS];
    let mut cdf = 0u32;
    for (slot, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *slot = (cdf as f32 * scale).round().min(255.0);
    }
    lut
}

/// Lower and upper tile index around a fractional tile coordinate, plus the
/// blend weight toward the upper one.
fn neighbours(t: f32, count: usize) -> (usize, usize, f32) {
    let lower = t.floor();
    let weight = t - lower;
    let last = count as isize - 1;
    let i1 = (lower as isize).clamp(0, last) as usize;
    let i2 = (lower as isize + 1).clamp(0, last) as usize;
    (i1, i2, weight)
}
