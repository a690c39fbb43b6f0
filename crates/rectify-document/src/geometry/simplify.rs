// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed-outline simplification (Ramer-Douglas-Peucker) and polygon measures.

use rectify_core::Point;

/// Perimeter of a closed outline.
pub fn closed_perimeter(outline: &[Point]) -> f32 {
    if outline.len() < 2 {
        return 0.0;
    }
    let n = outline.len();
    (0..n)
        .map(|i| outline[i].distance(&outline[(i + 1) % n]))
        .sum()
}

/// Unsigned area of a closed outline via the shoelace formula.
pub fn polygon_area(outline: &[Point]) -> f32 {
    let n = outline.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for i in 0..n {
        let a = outline[i];
        let b = outline[(i + 1) % n];
        twice += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
    }
    (twice.abs() / 2.0) as f32
}

/// Simplify a closed outline so every dropped point lies within `epsilon`
/// of the kept polygon.
///
/// The outline is split at its first point and the point farthest from it;
/// each half goes through RDP. A final sweep removes kept vertices that are
/// themselves within `epsilon` of the chord between their neighbours, which
/// catches a split point that happened to sit mid-edge.
pub fn simplify_closed(outline: &[Point], epsilon: f32) -> Vec<Point> {
    let n = outline.len();
    if n < 3 {
        return outline.to_vec();
    }

    let start = 0;
    let far = (1..n)
        .max_by(|&a, &b| {
            outline[start]
                .distance(&outline[a])
                .total_cmp(&outline[start].distance(&outline[b]))
        })
        .unwrap_or(n / 2);

    // Walk the ring as one open chain start..far..start.
    let mut ring: Vec<Point> = outline.to_vec();
    ring.push(outline[start]);
    let last = ring.len() - 1;

    let mut kept = vec![false; ring.len()];
    kept[start] = true;
    kept[far] = true;
    kept[last] = true;
    rdp_recurse(&ring, start, far, epsilon, &mut kept);
    rdp_recurse(&ring, far, last, epsilon, &mut kept);

    let mut polygon: Vec<Point> = ring[..last]
        .iter()
        .zip(&kept[..last])
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    loop {
        if polygon.len() <= 3 {
            break;
        }
        let m = polygon.len();
        let redundant = (0..m).find(|&i| {
            let prev = polygon[(i + m - 1) % m];
            let next = polygon[(i + 1) % m];
            perpendicular_distance(polygon[i], prev, next) <= epsilon
        });
        match redundant {
            Some(i) => {
                polygon.remove(i);
            }
            None => break,
        }
    }

    polygon
}

fn rdp_recurse(points: &[Point], start: usize, end: usize, epsilon: f32, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Distance from `p` to the line through `a` and `b` (to `a` if they coincide).
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return p.distance(&a);
    }
    (dx * (a.y - p.y) - dy * (a.x - p.x)).abs() / length
}
