// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border trimmer — cuts thin margin strips off the long sides of a page
// rectangle when the oracle also reported them as separate candidates.

use folio_core::config::TrimPolicy;
use folio_core::{OrientedRect, Point2, Side, Warning};
use tracing::debug;

use crate::geometry::Annotation;

pub struct BorderTrimmer<'p> {
    policy: &'p TrimPolicy,
}

impl<'p> BorderTrimmer<'p> {
    pub fn new(policy: &'p TrimPolicy) -> Self {
        Self { policy }
    }

    /// Trimmed copy of `page`, with one warning per strip removed.
    ///
    /// `candidates` is every annotation of the photograph, not only the
    /// selected pages. The result is in upright form.
    pub fn trim(&self, page: &OrientedRect, candidates: &[Annotation]) -> (OrientedRect, Vec<Warning>) {
        let page = page.upright();
        let mut left: Option<f64> = None;
        let mut right: Option<f64> = None;

        for ann in candidates {
            let Some((side, strip)) = self.margin_strip(&page, ann) else {
                continue;
            };
            let slot = match side {
                Side::Left => &mut left,
                Side::Right => &mut right,
            };
            if slot.is_none() {
                *slot = strip_width(&page, &strip, side);
            }
        }

        let mut warnings = Vec::new();
        let (ux, uy) = page.width_axis();
        let mut trimmed = page;
        for (side, amount) in [(Side::Left, left), (Side::Right, right)] {
            let Some(t) = amount else { continue };
            if t >= trimmed.width {
                continue;
            }
            let shift = match side {
                Side::Left => t / 2.0,
                Side::Right => -t / 2.0,
            };
            trimmed.center = Point2::new(trimmed.center.x + shift * ux, trimmed.center.y + shift * uy);
            trimmed.width -= t;
            debug!(?side, width = t, "Margin strip trimmed");
            warnings.push(Warning::BorderTrimmed { side, width: t });
        }
        (trimmed, warnings)
    }

    /// The side of `page` that `ann` is a margin strip of, if any.
    fn margin_strip(&self, page: &OrientedRect, ann: &Annotation) -> Option<(Side, OrientedRect)> {
        let p = self.policy;
        if ann.squarishness() < p.squarishness_min || page.width <= 0.0 || page.height <= 0.0 {
            return None;
        }
        let strip = ann.oriented_rect().upright();
        if strip.width > p.max_width_ratio * page.width {
            return None;
        }
        if (strip.height - page.height).abs() / page.height > p.height_tolerance {
            return None;
        }
        let tolerance = p.flush_tolerance * page.width;
        if !strip.corners().iter().all(|c| page.contains(*c, tolerance)) {
            return None;
        }

        let (ux, uy) = page.width_axis();
        let along = (strip.center.x - page.center.x) * ux + (strip.center.y - page.center.y) * uy;
        let left_gap = along - strip.width / 2.0 + page.width / 2.0;
        let right_gap = page.width / 2.0 - (along + strip.width / 2.0);
        if left_gap.abs() <= tolerance {
            Some((Side::Left, strip))
        } else if right_gap.abs() <= tolerance {
            Some((Side::Right, strip))
        } else {
            None
        }
    }
}

/// Width the strip takes off `page`, measured along the page's own axis.
///
/// The midpoint of the strip's inner side is projected onto the page's
/// central axis through its x coordinate: the axis point with that x lies
/// `s = (x - cx) / cos(angle)` from the center.
fn strip_width(page: &OrientedRect, strip: &OrientedRect, side: Side) -> Option<f64> {
    let (ux, uy) = page.width_axis();
    let (sx, sy) = strip.width_axis();
    let toward_center = match side {
        Side::Left => 1.0,
        Side::Right => -1.0,
    };
    let sign = if sx * ux + sy * uy >= 0.0 { toward_center } else { -toward_center };
    let inner_x = strip.center.x + sign * strip.width / 2.0 * sx;

    if ux.abs() < f64::EPSILON {
        return None;
    }
    let s = (inner_x - page.center.x) / ux;
    let t = match side {
        Side::Left => s + page.width / 2.0,
        Side::Right => page.width / 2.0 - s,
    };
    (t > 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::CropWindow;

    fn from_rect(rect: &OrientedRect) -> Annotation {
        let pts: Vec<(i32, i32)> = rect
            .corners()
            .iter()
            .map(|p| (p.x.round() as i32, p.y.round() as i32))
            .collect();
        Annotation::from_contour(&pts, CropWindow::new(0.0, 0.0, 1000.0, 1000.0), 1000, 1000)
            .unwrap()
    }

    fn enabled() -> TrimPolicy {
        TrimPolicy {
            enabled: true,
            ..TrimPolicy::default()
        }
    }

    #[test]
    fn left_strip_is_removed() {
        let page = OrientedRect::new(Point2::new(500.0, 300.0), 800.0, 300.0, 0.0);
        let strip = OrientedRect::new(Point2::new(130.0, 300.0), 60.0, 300.0, 0.0);
        let policy = enabled();
        let (trimmed, warnings) = BorderTrimmer::new(&policy).trim(&page, &[from_rect(&strip)]);
        assert!((trimmed.width - 740.0).abs() < 1.0);
        assert!((trimmed.center.x - 530.0).abs() < 1.0);
        // Right edge stays put.
        assert!((trimmed.center.x + trimmed.width / 2.0 - 900.0).abs() < 1.0);
        assert!(matches!(warnings[0], Warning::BorderTrimmed { side: Side::Left, .. }));
    }

    #[test]
    fn right_strip_on_tilted_page() {
        let page = OrientedRect::new(Point2::new(500.0, 500.0), 800.0, 300.0, 10.0);
        let (ux, uy) = page.width_axis();
        let offset = 400.0 - 30.0;
        let strip = OrientedRect::new(
            Point2::new(500.0 + offset * ux, 500.0 + offset * uy),
            60.0,
            300.0,
            10.0,
        );
        let policy = enabled();
        let (trimmed, warnings) = BorderTrimmer::new(&policy).trim(&page, &[from_rect(&strip)]);
        assert_eq!(warnings.len(), 1);
        assert!((trimmed.width - 740.0).abs() < 2.0);
        let moved = (trimmed.center.x - 500.0) * ux + (trimmed.center.y - 500.0) * uy;
        assert!((moved + 30.0).abs() < 1.5);
    }

    #[test]
    fn wide_or_short_regions_are_not_strips() {
        let page = OrientedRect::new(Point2::new(500.0, 300.0), 800.0, 300.0, 0.0);
        let wide = OrientedRect::new(Point2::new(200.0, 300.0), 200.0, 300.0, 0.0);
        let short = OrientedRect::new(Point2::new(130.0, 250.0), 60.0, 150.0, 0.0);
        let policy = enabled();
        let (trimmed, warnings) =
            BorderTrimmer::new(&policy).trim(&page, &[from_rect(&wide), from_rect(&short)]);
        assert!(warnings.is_empty());
        assert_eq!(trimmed, page);
    }

    #[test]
    fn strip_away_from_edges_is_ignored() {
        let page = OrientedRect::new(Point2::new(500.0, 300.0), 800.0, 300.0, 0.0);
        let middle = OrientedRect::new(Point2::new(500.0, 300.0), 60.0, 300.0, 0.0);
        let policy = enabled();
        let (_, warnings) = BorderTrimmer::new(&policy).trim(&page, &[from_rect(&middle)]);
        assert!(warnings.is_empty());
    }
}
