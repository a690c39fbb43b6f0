// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Straight lines in normal form: construction, least-squares fitting, and
// intersection.

use rectify_core::Point;

/// The line `x * nx + y * ny = c`, with `(nx, ny)` a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    nx: f64,
    ny: f64,
    c: f64,
}

impl Line {
    fn from_direction(dx: f64, dy: f64, through: (f64, f64)) -> Option<Self> {
        let len = dx.hypot(dy);
        if len < 1e-9 {
            return None;
        }
        let (nx, ny) = (-dy / len, dx / len);
        Some(Self {
            nx,
            ny,
            c: through.0 * nx + through.1 * ny,
        })
    }

    /// The line through `a` and `b`, or `None` if they coincide.
    pub fn through(a: Point, b: Point) -> Option<Self> {
        Self::from_direction(
            f64::from(b.x - a.x),
            f64::from(b.y - a.y),
            (f64::from(a.x), f64::from(a.y)),
        )
    }

    /// Total least-squares fit: minimises the sum of squared perpendicular
    /// distances. Needs at least two distinct points.
    pub fn fit(points: &[Point]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let (mut mx, mut my) = (0.0f64, 0.0f64);
        for p in points {
            mx += f64::from(p.x);
            my += f64::from(p.y);
        }
        mx /= n;
        my /= n;

        let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);
        for p in points {
            let dx = f64::from(p.x) - mx;
            let dy = f64::from(p.y) - my;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        if sxx + syy < 1e-9 {
            return None;
        }

        // Principal axis of the scatter.
        let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        Self::from_direction(theta.cos(), theta.sin(), (mx, my))
    }

    /// Signed perpendicular distance from `p`.
    pub fn distance(&self, p: Point) -> f32 {
        (f64::from(p.x) * self.nx + f64::from(p.y) * self.ny - self.c) as f32
    }

    /// Crossing point with `other`, or `None` for (nearly) parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<Point> {
        let det = self.nx * other.ny - self.ny * other.nx;
        if det.abs() < 1e-6 {
            return None;
        }
        let x = (self.c * other.ny - other.c * self.ny) / det;
        let y = (self.nx * other.c - other.nx * self.c) / det;
        Some(Point::new(x as f32, y as f32))
    }
}
