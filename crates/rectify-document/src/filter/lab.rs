// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar CIE Lab view of an sRGB image.

use image::{Rgb, RgbImage};
use palette::{IntoColor, Lab, LinSrgb, Srgb};

/// L* in [0, 100], a* and b* roughly [-128, 128], one plane per channel.
pub(crate) struct LabPlanes {
    pub width: u32,
    pub height: u32,
    pub l: Vec<f32>,
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

impl LabPlanes {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let len = image.width() as usize * image.height() as usize;
        let mut l = Vec::with_capacity(len);
        let mut a = Vec::with_capacity(len);
        let mut b = Vec::with_capacity(len);

        for px in image.pixels() {
            let lab = rgb_to_lab(*px);
            l.push(lab.l);
            a.push(lab.a);
            b.push(lab.b);
        }

        Self {
            width: image.width(),
            height: image.height(),
            l,
            a,
            b,
        }
    }

    pub fn to_rgb(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width, self.height);
        for (i, px) in out.pixels_mut().enumerate() {
            *px = lab_to_rgb(Lab::new(self.l[i], self.a[i], self.b[i]));
        }
        out
    }
}

fn rgb_to_lab(px: Rgb<u8>) -> Lab {
    let [r, g, b] = px.0;
    let srgb = Srgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    let lin: LinSrgb<f32> = srgb.into_linear();
    lin.into_color()
}

fn lab_to_rgb(lab: Lab) -> Rgb<u8> {
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    Rgb([to_u8(srgb.red), to_u8(srgb.green), to_u8(srgb.blue)])
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
