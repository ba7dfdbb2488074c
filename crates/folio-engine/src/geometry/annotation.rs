// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry builder — turns one oracle mask into an `Annotation`: the
// dominant contour of the mask at the photograph's resolution, with its
// minimum-area rectangle, bounding box and shape metrics.

use folio_core::config::{GeometryOptions, PageDirection};
use folio_core::error::{FolioError, Result};
use folio_core::{BoundingBox, CropWindow, OrientedRect, Point2, Rotation};
use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;
use tracing::{debug, instrument};

use super::hull::{min_area_rect, shoelace_area};
use crate::oracle::OracleMask;

/// A candidate region with geometry derived from its largest contour.
///
/// Built once by [`GeometryBuilder::build`] and never modified; every
/// derived field comes from `contour`.
#[derive(Debug, Clone)]
pub struct Annotation {
    contour: Vec<Point2>,
    contour_area: f64,
    oriented_rect: OrientedRect,
    bbox: BoundingBox,
    crop_window: CropWindow,
    frame_width: u32,
    frame_height: u32,
}

impl Annotation {
    /// Derive the geometry of an already-traced contour in a
    /// `frame_width` x `frame_height` photograph.
    pub fn from_contour(
        points: &[(i32, i32)],
        crop_window: CropWindow,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self> {
        let bbox = BoundingBox::from_points(points.iter().copied()).ok_or(FolioError::EmptyMask)?;
        let contour: Vec<Point2> = points
            .iter()
            .map(|&(x, y)| Point2::new(x as f64, y as f64))
            .collect();
        let contour_area = shoelace_area(&contour);
        let oriented_rect = min_area_rect(&contour);
        Ok(Self {
            contour,
            contour_area,
            oriented_rect,
            bbox,
            crop_window,
            frame_width,
            frame_height,
        })
    }

    pub fn contour(&self) -> &[Point2] {
        &self.contour
    }

    pub fn contour_area(&self) -> f64 {
        self.contour_area
    }

    pub fn oriented_rect(&self) -> &OrientedRect {
        &self.oriented_rect
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Oracle crop window, in photograph pixels.
    pub fn crop_window(&self) -> &CropWindow {
        &self.crop_window
    }

    pub fn frame_dims(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Contour area over oriented-rectangle area.
    pub fn squarishness(&self) -> f64 {
        let rect_area = self.oriented_rect.area();
        if rect_area <= 0.0 {
            return 0.0;
        }
        self.contour_area / rect_area
    }

    /// Width over height of the bounding box.
    pub fn aspect_ratio(&self) -> f64 {
        self.bbox.aspect_ratio()
    }

    /// Contour area as a fraction of the photograph.
    pub fn area_ratio(&self) -> f64 {
        let frame = self.frame_width as f64 * self.frame_height as f64;
        if frame <= 0.0 {
            return 0.0;
        }
        self.contour_area / frame
    }

    /// Number of crop-window edges the bounding box lies within
    /// `tolerance` pixels of.
    pub fn edges_touched(&self, tolerance: f64) -> usize {
        let b = &self.bbox;
        let w = &self.crop_window;
        [
            (b.x as f64 - w.left).abs(),
            (b.y as f64 - w.top).abs(),
            (w.right - b.right() as f64).abs(),
            (w.bottom - b.bottom() as f64).abs(),
        ]
        .iter()
        .filter(|d| **d <= tolerance)
        .count()
    }

    /// Whether the bounding box covers the whole frame along `direction`.
    pub fn spans_frame(&self, direction: PageDirection, tolerance: f64) -> bool {
        let b = &self.bbox;
        match direction {
            PageDirection::Vertical => {
                b.y as f64 <= tolerance && b.bottom() as f64 >= self.frame_height as f64 - tolerance
            }
            PageDirection::Horizontal => {
                b.x as f64 <= tolerance && b.right() as f64 >= self.frame_width as f64 - tolerance
            }
        }
    }
}

/// Builds annotations from oracle masks.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuilder {
    options: GeometryOptions,
}

impl GeometryBuilder {
    pub fn new(options: GeometryOptions) -> Self {
        Self { options }
    }

    /// Build the annotation of one mask.
    ///
    /// `rotation` is the pre-rotation applied to the photograph and
    /// `target_width` x `target_height` its size after that rotation.
    /// Returns [`FolioError::EmptyMask`] when no contour survives cleanup.
    #[instrument(skip(self, mask), fields(mask_w = mask.mask.width(), mask_h = mask.mask.height()))]
    pub fn build(
        &self,
        mask: &OracleMask,
        rotation: Rotation,
        target_width: u32,
        target_height: u32,
    ) -> Result<Annotation> {
        let (mask_w, mask_h) = mask.mask.dimensions();

        let binary = binarize(&mask.mask);
        let rotated = rotate_mask(&binary, rotation);
        let eroded = self.erode(rotated);
        let resized = if eroded.dimensions() == (target_width, target_height) {
            eroded
        } else {
            imageops::resize(&eroded, target_width, target_height, FilterType::Nearest)
        };

        let points = largest_contour(&resized).ok_or(FolioError::EmptyMask)?;

        let (rot_w, rot_h) = rotation.rotated_dims(mask_w, mask_h);
        let crop_window = rotation
            .rotate_window(&mask.crop_window, mask_w as f64, mask_h as f64)
            .scaled(
                target_width as f64 / rot_w.max(1) as f64,
                target_height as f64 / rot_h.max(1) as f64,
            );

        let annotation = Annotation::from_contour(&points, crop_window, target_width, target_height)?;
        debug!(
            contour_points = points.len(),
            contour_area = annotation.contour_area,
            squarishness = annotation.squarishness(),
            "Annotation built"
        );
        Ok(annotation)
    }

    fn erode(&self, mask: GrayImage) -> GrayImage {
        let radius = self.options.erosion_kernel / 2;
        if radius == 0 {
            return mask;
        }
        erode(&mask, Norm::LInf, radius.min(u8::MAX as u32) as u8)
    }
}

fn binarize(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > 0 { 255 } else { 0 };
    }
    out
}

/// Counter-clockwise quarter turns, matching the photograph pre-rotation.
pub(crate) fn rotate_mask(mask: &GrayImage, rotation: Rotation) -> GrayImage {
    match rotation {
        Rotation::Deg0 => mask.clone(),
        Rotation::Deg90 => imageops::rotate270(mask),
        Rotation::Deg180 => imageops::rotate180(mask),
        Rotation::Deg270 => imageops::rotate90(mask),
    }
}

/// Outer contour enclosing the largest area.
fn largest_contour(mask: &GrayImage) -> Option<Vec<(i32, i32)>> {
    let mut best: Option<(f64, Vec<(i32, i32)>)> = None;
    for contour in find_contours::<i32>(mask) {
        if contour.border_type != BorderType::Outer || contour.points.is_empty() {
            continue;
        }
        let points: Vec<(i32, i32)> = contour.points.iter().map(|p| (p.x, p.y)).collect();
        let as_f: Vec<Point2> = points
            .iter()
            .map(|&(x, y)| Point2::new(x as f64, y as f64))
            .collect();
        let area = shoelace_area(&as_f);
        if best.as_ref().is_none_or(|(a, _)| area > *a) {
            best = Some((area, points));
        }
    }
    best.map(|(_, points)| points)
}
