// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page orderer — reading direction from the spread of page centers.

use folio_core::Point2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingDirection {
    LeftToRight,
    TopToBottom,
}

/// Dominant layout axis of a set of page centers, `None` for fewer than two.
pub fn reading_direction(centers: &[Point2]) -> Option<ReadingDirection> {
    if centers.len() < 2 {
        return None;
    }
    let range = |f: fn(&Point2) -> f64| {
        let (lo, hi) = centers
            .iter()
            .map(f)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        hi - lo
    };
    if range(|p| p.x) > range(|p| p.y) {
        Some(ReadingDirection::LeftToRight)
    } else {
        Some(ReadingDirection::TopToBottom)
    }
}

/// Sort `items` into reading order. The sort is stable, so items sharing a
/// coordinate keep their relative order.
pub fn order_by_reading<T>(items: &mut [T], center: impl Fn(&T) -> Point2) -> Option<ReadingDirection> {
    let centers: Vec<Point2> = items.iter().map(&center).collect();
    let direction = reading_direction(&centers)?;
    match direction {
        ReadingDirection::LeftToRight => items.sort_by(|a, b| center(a).x.total_cmp(&center(b).x)),
        ReadingDirection::TopToBottom => items.sort_by(|a, b| center(a).y.total_cmp(&center(b).y)),
    }
    Some(direction)
}
