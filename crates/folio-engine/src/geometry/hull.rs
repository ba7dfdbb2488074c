// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polygon helpers: shoelace area, convex hull and the minimum-area enclosing
// rectangle (rotating calipers over the hull edges).

use folio_core::{OrientedRect, Point2};

/// Area of a simple polygon via the shoelace formula. The vertices may be
/// in either winding order.
pub fn shoelace_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

fn cross(o: Point2, a: Point2, b: Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull (Andrew's monotone chain), without collinear points.
///
/// Returns the input deduplicated when fewer than three distinct points are
/// given.
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Smallest-area rectangle enclosing `points`.
///
/// The angle of the result lies in `[0, 90)`. Degenerate inputs (a single
/// point, or collinear points) give a rectangle with zero height.
pub fn min_area_rect(points: &[Point2]) -> OrientedRect {
    let hull = convex_hull(points);
    match hull.len() {
        0 => return OrientedRect::new(Point2::default(), 0.0, 0.0, 0.0),
        1 => return OrientedRect::new(hull[0], 0.0, 0.0, 0.0),
        2 => {
            let (a, b) = (hull[0], hull[1]);
            let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            let angle = (b.y - a.y).atan2(b.x - a.x).to_degrees();
            let center = Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            return normalized(OrientedRect::new(center, len, 0.0, angle));
        }
        _ => {}
    }

    let n = hull.len();
    let mut best: Option<(f64, OrientedRect)> = None;
    for i in 0..n {
        let origin = hull[i];
        let next = hull[(i + 1) % n];
        let (ex, ey) = (next.x - origin.x, next.y - origin.y);
        let len = (ex * ex + ey * ey).sqrt();
        if len < f64::EPSILON {
            continue;
        }
        let (ux, uy) = (ex / len, ey / len);
        let (vx, vy) = (-uy, ux);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &hull {
            let dx = p.x - origin.x;
            let dy = p.y - origin.y;
            let u = dx * ux + dy * uy;
            let v = dx * vx + dy * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;
        if best.as_ref().is_some_and(|(a, _)| *a <= area) {
            continue;
        }
        let cu = (min_u + max_u) / 2.0;
        let cv = (min_v + max_v) / 2.0;
        let center = Point2::new(
            origin.x + cu * ux + cv * vx,
            origin.y + cu * uy + cv * vy,
        );
        let angle = uy.atan2(ux).to_degrees();
        best = Some((area, OrientedRect::new(center, width, height, angle)));
    }

    match best {
        Some((_, rect)) => normalized(rect),
        None => OrientedRect::new(hull[0], 0.0, 0.0, 0.0),
    }
}

/// Bring the angle into `[0, 90)`, swapping the sides for each quarter turn.
fn normalized(mut rect: OrientedRect) -> OrientedRect {
    rect.angle = rect.angle.rem_euclid(180.0);
    if rect.angle >= 90.0 {
        rect.angle -= 90.0;
        std::mem::swap(&mut rect.width, &mut rect.height);
    }
    // Within rounding noise of 90 counts as axis-aligned.
    if 90.0 - rect.angle < 1e-9 {
        rect.angle = 0.0;
        std::mem::swap(&mut rect.width, &mut rect.height);
    }
    rect
}
