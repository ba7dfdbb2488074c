// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry primitives shared by the engine and the batch driver: points,
// axis-aligned boxes, oracle crop windows, oriented rectangles and the
// quarter-turn pre-rotation applied to photographs.

use serde::{Deserialize, Serialize};

/// A point in image coordinates (x to the right, y downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in integer pixels.
///
/// `width` and `height` count pixels, so a box built from the points
/// `(0, 0)` and `(9, 4)` is 10 x 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = (i32, i32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Width over height. Zero-height boxes report `f64::INFINITY`.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return f64::INFINITY;
        }
        self.width as f64 / self.height as f64
    }

    /// Overlapping region of two boxes, `None` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn intersection_area(&self, other: &Self) -> i64 {
        self.intersection(other).map_or(0, |b| b.area())
    }

    /// Smallest box enclosing both boxes.
    pub fn hull(&self, other: &Self) -> Self {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Intersection over union. Two empty boxes have an IoU of 0.
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f64 / union as f64
    }

    /// Fraction of `self` lying inside `other` (1.0 = fully contained).
    pub fn fraction_inside(&self, other: &Self) -> f64 {
        let area = self.area();
        if area == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f64 / area as f64
    }
}

/// The oracle's sampling window for one candidate, as left/top/right/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropWindow {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropWindow {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rescale from one resolution to another.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(
            self.left * sx,
            self.top * sy,
            self.right * sx,
            self.bottom * sy,
        )
    }
}

impl From<[f64; 4]> for CropWindow {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// A rotated rectangle: center, size and rotation in degrees.
///
/// `width` is measured along the direction `(cos angle, sin angle)` and
/// `height` along `(-sin angle, cos angle)`, in image coordinates. The same
/// physical rectangle can be written with `angle ± 90` and the sizes
/// swapped; [`OrientedRect::upright`] picks the representation closest to
/// axis-aligned.
///
/// Serialised as `[cx, cy, w, h, angle]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct OrientedRect {
    pub center: Point2,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl OrientedRect {
    pub fn new(center: Point2, width: f64, height: f64, angle: f64) -> Self {
        Self {
            center,
            width,
            height,
            angle,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Unit vector along the width axis.
    pub fn width_axis(&self) -> (f64, f64) {
        let rad = self.angle.to_radians();
        (rad.cos(), rad.sin())
    }

    /// Unit vector along the height axis.
    pub fn height_axis(&self) -> (f64, f64) {
        let (c, s) = self.width_axis();
        (-s, c)
    }

    /// Corners in order: (-w,-h), (+w,-h), (+w,+h), (-w,+h) relative to the
    /// rectangle's own axes.
    pub fn corners(&self) -> [Point2; 4] {
        let (ux, uy) = self.width_axis();
        let (vx, vy) = self.height_axis();
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        let at = |a: f64, b: f64| {
            Point2::new(
                self.center.x + a * ux + b * vx,
                self.center.y + a * uy + b * vy,
            )
        };
        [at(-hw, -hh), at(hw, -hh), at(hw, hh), at(-hw, hh)]
    }

    /// Same rectangle with the angle brought into (-45, 45], swapping
    /// width and height for each quarter turn removed.
    pub fn upright(&self) -> Self {
        let mut rect = *self;
        while rect.angle > 45.0 {
            rect.angle -= 90.0;
            std::mem::swap(&mut rect.width, &mut rect.height);
        }
        while rect.angle <= -45.0 {
            rect.angle += 90.0;
            std::mem::swap(&mut rect.width, &mut rect.height);
        }
        rect
    }

    /// Whether `p` lies inside the rectangle, allowing `tolerance` pixels of
    /// slack on every side.
    pub fn contains(&self, p: Point2, tolerance: f64) -> bool {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        let (ux, uy) = self.width_axis();
        let (vx, vy) = self.height_axis();
        let along = dx * ux + dy * uy;
        let across = dx * vx + dy * vy;
        along.abs() <= self.width / 2.0 + tolerance && across.abs() <= self.height / 2.0 + tolerance
    }

    /// Axis-aligned box around the corners, clamped to a `max_width` x
    /// `max_height` frame.
    pub fn bounding_box(&self, max_width: u32, max_height: u32) -> BoundingBox {
        let corners = self.corners();
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        let x1 = (min_x.floor().max(0.0) as i64).min(max_width as i64) as i32;
        let y1 = (min_y.floor().max(0.0) as i64).min(max_height as i64) as i32;
        let x2 = (max_x.ceil().max(0.0) as i64).min(max_width as i64) as i32;
        let y2 = (max_y.ceil().max(0.0) as i64).min(max_height as i64) as i32;
        BoundingBox::new(x1, y1, x2 - x1, y2 - y1)
    }
}

impl From<[f64; 5]> for OrientedRect {
    fn from(v: [f64; 5]) -> Self {
        Self::new(Point2::new(v[0], v[1]), v[2], v[3], v[4])
    }
}

impl From<OrientedRect> for [f64; 5] {
    fn from(r: OrientedRect) -> Self {
        [r.center.x, r.center.y, r.width, r.height, r.angle]
    }
}

/// Counter-clockwise quarter-turn applied to a photograph before any
/// geometry is measured.
///
/// Serialised as the number of degrees (0, 90, 180 or 270).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Dimensions of a `width` x `height` frame after rotation.
    pub fn rotated_dims(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::Deg0 | Self::Deg180 => (width, height),
            Self::Deg90 | Self::Deg270 => (height, width),
        }
    }

    /// Map a crop window from a `width` x `height` frame into the rotated
    /// frame.
    pub fn rotate_window(&self, w: &CropWindow, width: f64, height: f64) -> CropWindow {
        match self {
            Self::Deg0 => *w,
            // (x, y) -> (y, W - x)
            Self::Deg90 => CropWindow::new(w.top, width - w.right, w.bottom, width - w.left),
            // (x, y) -> (W - x, H - y)
            Self::Deg180 => CropWindow::new(
                width - w.right,
                height - w.bottom,
                width - w.left,
                height - w.top,
            ),
            // (x, y) -> (H - y, x)
            Self::Deg270 => CropWindow::new(height - w.bottom, w.left, height - w.top, w.right),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}
