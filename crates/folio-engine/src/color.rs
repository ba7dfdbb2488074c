// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Color calibrator — white balance and exposure from a color-card patch,
// computed and applied in linear sRGB, and propagated across a batch.

use folio_core::config::CalibrationConfig;
use folio_core::error::{FolioError, Result};
use folio_core::{BoundingBox, ColorCorrection, ExposureInfo};
use image::{DynamicImage, ImageBuffer, Pixel};
use tracing::{debug, instrument};

/// Rec. 709 luminance weights for linear R, G, B.
const LUMA_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// sRGB-encoded value in `[0, 1]` to linear light.
pub fn srgb_to_linear(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear light to sRGB encoding. Input is not clipped.
pub fn linear_to_srgb(v: f64) -> f64 {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Correct one sRGB-encoded value in `[0, 1]` by a linear `gain`.
pub fn correct_value(v: f64, gain: f64) -> f64 {
    linear_to_srgb(srgb_to_linear(v) * gain).clamp(0.0, 1.0)
}

/// Inverse of [`correct_value`] for values that were not clipped.
pub fn invert_value(v: f64, gain: f64) -> f64 {
    linear_to_srgb(srgb_to_linear(v) / gain).clamp(0.0, 1.0)
}

/// Derives corrections from color-card patches.
pub struct ColorCalibrator<'c> {
    config: &'c CalibrationConfig,
}

impl<'c> ColorCalibrator<'c> {
    pub fn new(config: &'c CalibrationConfig) -> Self {
        Self { config }
    }

    /// Correction used until a batch has seen its first patch.
    pub fn default_correction(&self) -> ColorCorrection {
        ColorCorrection {
            white_balance: self.config.default_white_balance,
            exposure: self.config.default_exposure,
            source_exif: ExposureInfo::default(),
            origin: None,
        }
    }

    /// Measure the patch covering `patch` in `image`.
    ///
    /// White balance scales every channel up to the strongest one; exposure
    /// then brings the balanced patch to the configured target value.
    #[instrument(skip(self, image, exif, origin), fields(origin = origin.as_deref()))]
    pub fn calibrate(
        &self,
        image: &DynamicImage,
        patch: &BoundingBox,
        exif: ExposureInfo,
        origin: Option<String>,
    ) -> Result<ColorCorrection> {
        let frame = BoundingBox::new(0, 0, image.width() as i32, image.height() as i32);
        let area = patch
            .intersection(&frame)
            .ok_or_else(|| FolioError::Calibration(format!("patch {patch:?} lies outside the image")))?;
        let samples = image
            .crop_imm(area.x as u32, area.y as u32, area.width as u32, area.height as u32)
            .to_rgb32f();

        let mut linear = [0.0f64; 3];
        for (ch, value) in linear.iter_mut().enumerate() {
            let mut channel: Vec<f32> = samples.pixels().map(|p| p.0[ch]).collect();
            *value = srgb_to_linear(median(&mut channel));
        }
        if linear.iter().any(|v| *v <= 0.0) {
            return Err(FolioError::Calibration(format!(
                "patch {patch:?} has a black channel: {linear:?}"
            )));
        }

        let max = linear.iter().copied().fold(f64::MIN, f64::max);
        let white_balance = linear.map(|v| max / v);
        let luminance: f64 = (0..3)
            .map(|ch| LUMA_WEIGHTS[ch] * linear[ch] * white_balance[ch])
            .sum();
        let exposure = srgb_to_linear(self.config.target_value) / luminance;
        debug!(?white_balance, exposure, "Patch measured");

        Ok(ColorCorrection {
            white_balance,
            exposure,
            source_exif: exif,
            origin,
        })
    }
}

fn median(values: &mut [f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    } else {
        values[mid] as f64
    }
}

/// Reuse `correction` on a photograph with exposure settings `target`.
///
/// When both exposure times are known the exposure gain follows their ratio,
/// damped by `damping` (0 ignores the ratio, 1 applies it in full).
pub fn propagate(correction: &ColorCorrection, target: &ExposureInfo, damping: f64) -> ColorCorrection {
    let mut out = correction.clone();
    if let (Some(source), Some(dest)) = (correction.source_exif.exposure_time, target.exposure_time) {
        if source > 0.0 && dest > 0.0 {
            let ratio = source / dest;
            out.exposure *= 1.0 + damping * (ratio - 1.0);
        }
    }
    out
}

/// Tracks the correction to use as a batch is walked in order.
#[derive(Debug, Clone)]
pub struct CalibrationChain {
    default: ColorCorrection,
    current: Option<ColorCorrection>,
    damping: f64,
}

impl CalibrationChain {
    pub fn new(default: ColorCorrection, damping: f64) -> Self {
        Self {
            default,
            current: None,
            damping,
        }
    }

    /// A photograph with its own patch was reached.
    pub fn record(&mut self, correction: ColorCorrection) {
        self.current = Some(correction);
    }

    /// Correction for a photograph without its own patch.
    pub fn correction_for(&self, exif: &ExposureInfo) -> ColorCorrection {
        match &self.current {
            Some(c) => propagate(c, exif, self.damping),
            None => self.default.clone(),
        }
    }
}

/// Apply `correction` to every pixel. Alpha is left alone; grayscale images
/// only receive the exposure gain.
pub fn apply_correction(image: DynamicImage, correction: &ColorCorrection) -> DynamicImage {
    if correction.is_identity() {
        return image;
    }
    let rgb_gains = [correction.gain(0), correction.gain(1), correction.gain(2)];
    let gray_gain = [correction.exposure];
    match image {
        DynamicImage::ImageRgb8(mut img) => {
            apply_luts(&mut img, &rgb_gains.map(lut8));
            DynamicImage::ImageRgb8(img)
        }
        DynamicImage::ImageRgba8(mut img) => {
            apply_luts(&mut img, &rgb_gains.map(lut8));
            DynamicImage::ImageRgba8(img)
        }
        DynamicImage::ImageLuma8(mut img) => {
            apply_luts(&mut img, &gray_gain.map(lut8));
            DynamicImage::ImageLuma8(img)
        }
        DynamicImage::ImageLumaA8(mut img) => {
            apply_luts(&mut img, &gray_gain.map(lut8));
            DynamicImage::ImageLumaA8(img)
        }
        DynamicImage::ImageRgb16(mut img) => {
            apply_luts(&mut img, &rgb_gains.map(lut16));
            DynamicImage::ImageRgb16(img)
        }
        DynamicImage::ImageRgba16(mut img) => {
            apply_luts(&mut img, &rgb_gains.map(lut16));
            DynamicImage::ImageRgba16(img)
        }
        DynamicImage::ImageLuma16(mut img) => {
            apply_luts(&mut img, &gray_gain.map(lut16));
            DynamicImage::ImageLuma16(img)
        }
        DynamicImage::ImageLumaA16(mut img) => {
            apply_luts(&mut img, &gray_gain.map(lut16));
            DynamicImage::ImageLumaA16(img)
        }
        other => apply_correction(DynamicImage::ImageRgba16(other.to_rgba16()), correction),
    }
}

/// Map the leading channels of every pixel through one table each.
fn apply_luts<P>(img: &mut ImageBuffer<P, Vec<P::Subpixel>>, luts: &[Vec<P::Subpixel>])
where
    P: Pixel,
    P::Subpixel: Into<usize>,
{
    for p in img.pixels_mut() {
        for (value, lut) in p.channels_mut().iter_mut().zip(luts) {
            *value = lut[(*value).into()];
        }
    }
}

fn lut8(gain: f64) -> Vec<u8> {
    (0..=u8::MAX as u32)
        .map(|v| (correct_value(v as f64 / 255.0, gain) * 255.0).round() as u8)
        .collect()
}

fn lut16(gain: f64) -> Vec<u16> {
    (0..=u16::MAX as u32)
        .map(|v| (correct_value(v as f64 / 65535.0, gain) * 65535.0).round() as u16)
        .collect()
}
