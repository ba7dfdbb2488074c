// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page extractor — turns a page rectangle into pixels, either as the
// axis-aligned crop around it or as a de-skewed crop of the rectangle
// itself. Also applies the quarter-turn pre-rotation of a photograph.

use folio_core::config::ExtractionMode;
use folio_core::error::{FolioError, Result};
use folio_core::{BoundingBox, OrientedRect, Rotation};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, instrument};

/// Below this angle (degrees) a rectangle is cropped without resampling.
const AXIS_ALIGNED_EPSILON: f64 = 0.01;

/// Applies a warp to one `DynamicImage` variant, white outside the source.
macro_rules! warp_variant {
    ($img:expr, $proj:expr, $w:expr, $h:expr, $variant:ident, $white:expr) => {{
        let mut out = ImageBuffer::new($w, $h);
        warp_into($img, $proj, Interpolation::Bilinear, $white, &mut out);
        DynamicImage::$variant(out)
    }};
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageExtractor {
    mode: ExtractionMode,
}

impl PageExtractor {
    pub fn new(mode: ExtractionMode) -> Self {
        Self { mode }
    }

    /// Extract the pixels of `rect` from `image`.
    ///
    /// Bilevel sources are rotated as 8-bit grayscale and thresholded back
    /// to pure black and white afterwards.
    #[instrument(skip(self, image), fields(mode = ?self.mode))]
    pub fn extract(&self, image: &DynamicImage, rect: &OrientedRect, bilevel: bool) -> Result<DynamicImage> {
        match self.mode {
            ExtractionMode::AxisAligned => {
                let bbox = rect.bounding_box(image.width(), image.height());
                crop(image, &bbox)
            }
            ExtractionMode::RotationCorrected => {
                let upright = rect.upright();
                check_size(&upright, image)?;
                if upright.angle.abs() < AXIS_ALIGNED_EPSILON {
                    if let Some(bbox) = centered_box(&upright, image.width(), image.height()) {
                        return crop(image, &bbox);
                    }
                    debug!("Page extends past the image, padding");
                }
                if bilevel {
                    let gray = DynamicImage::ImageLuma8(image.to_luma8());
                    let rotated = deskew(&gray, &upright)?;
                    Ok(DynamicImage::ImageLuma8(threshold(rotated.to_luma8())))
                } else {
                    deskew(image, &upright)
                }
            }
        }
    }
}

/// Apply a counter-clockwise quarter-turn to a photograph.
pub fn rotate_quarter(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Deg0 => image,
        Rotation::Deg90 => image.rotate270(),
        Rotation::Deg180 => image.rotate180(),
        Rotation::Deg270 => image.rotate90(),
    }
}

fn crop(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage> {
    if bbox.width <= 0 || bbox.height <= 0 {
        return Err(FolioError::ImageError(format!(
            "page rectangle {bbox:?} lies outside the {}x{} image",
            image.width(),
            image.height()
        )));
    }
    debug!(x = bbox.x, y = bbox.y, w = bbox.width, h = bbox.height, "Cropping page");
    Ok(image.crop_imm(bbox.x as u32, bbox.y as u32, bbox.width as u32, bbox.height as u32))
}

/// Box of the rectangle's size anchored at its center, or `None` when it
/// does not fit inside the image.
fn centered_box(rect: &OrientedRect, max_width: u32, max_height: u32) -> Option<BoundingBox> {
    let x1 = (rect.center.x - rect.width / 2.0).round();
    let y1 = (rect.center.y - rect.height / 2.0).round();
    let x2 = (rect.center.x + rect.width / 2.0).round();
    let y2 = (rect.center.y + rect.height / 2.0).round();
    if x1 < 0.0 || y1 < 0.0 || x2 > max_width as f64 || y2 > max_height as f64 {
        return None;
    }
    Some(BoundingBox::new(x1 as i32, y1 as i32, (x2 - x1) as i32, (y2 - y1) as i32))
}

/// A page can be no larger than the image diagonal.
fn check_size(rect: &OrientedRect, image: &DynamicImage) -> Result<()> {
    let diagonal = (image.width() as f64).hypot(image.height() as f64).ceil();
    let fits = |v: f64| v.is_finite() && v <= diagonal;
    if !fits(rect.width) || !fits(rect.height) || !rect.center.x.is_finite() || !rect.center.y.is_finite() {
        return Err(FolioError::ImageError(format!(
            "page rectangle {rect:?} does not fit the {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Rotate about the rectangle center so that its width axis is horizontal,
/// then keep exactly the rectangle.
fn deskew(image: &DynamicImage, rect: &OrientedRect) -> Result<DynamicImage> {
    let out_w = rect.width.round() as u32;
    let out_h = rect.height.round() as u32;
    if out_w == 0 || out_h == 0 {
        return Err(FolioError::ImageError(format!("degenerate page rectangle {rect:?}")));
    }

    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(-(rect.angle.to_radians() as f32))
        * Projection::translate(-(rect.center.x as f32), -(rect.center.y as f32));
    debug!(out_w, out_h, angle = rect.angle, "De-skewing page");

    let out = match image {
        DynamicImage::ImageLuma8(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageLuma8, Luma([u8::MAX]))
        }
        DynamicImage::ImageLumaA8(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageLumaA8, LumaA([u8::MAX; 2]))
        }
        DynamicImage::ImageRgb8(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageRgb8, Rgb([u8::MAX; 3]))
        }
        DynamicImage::ImageRgba8(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageRgba8, Rgba([u8::MAX; 4]))
        }
        DynamicImage::ImageLuma16(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageLuma16, Luma([u16::MAX]))
        }
        DynamicImage::ImageRgb16(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageRgb16, Rgb([u16::MAX; 3]))
        }
        DynamicImage::ImageRgba16(img) => {
            warp_variant!(img, &projection, out_w, out_h, ImageRgba16, Rgba([u16::MAX; 4]))
        }
        other => {
            let rgba = other.to_rgba16();
            warp_variant!(&rgba, &projection, out_w, out_h, ImageRgba16, Rgba([u16::MAX; 4]))
        }
    };
    Ok(out)
}

fn threshold(mut gray: GrayImage) -> GrayImage {
    for p in gray.pixels_mut() {
        p.0[0] = if p.0[0] >= 128 { 255 } else { 0 };
    }
    gray
}
