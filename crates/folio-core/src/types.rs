// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Folio: QC warnings, exposure metadata and color
// correction values.

use serde::{Deserialize, Serialize};

/// Which long side of a page a margin strip was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// A QC warning attached to a single page.
///
/// Warnings never block output; they flag pages a human should look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Accepted, but the contour fills its rectangle less than expected.
    LowSquarishness { value: f64 },
    /// Accepted from the tolerant aspect-ratio range only.
    UnexpectedAspectRatio { value: f64 },
    /// A margin strip was cut off one side of the page rectangle.
    BorderTrimmed { side: Side, width: f64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowSquarishness { value } => write!(f, "low squarishness ({value:.3})"),
            Self::UnexpectedAspectRatio { value } => {
                write!(f, "unexpected aspect ratio ({value:.2})")
            }
            Self::BorderTrimmed { side, width } => {
                write!(f, "trimmed {width:.0}px margin strip on the {side:?} side")
            }
        }
    }
}

/// A QC warning attached to a whole photograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhotoWarning {
    /// Number of selected pages differs from the expected count.
    PageCount { found: usize, expected: usize },
    /// Nothing was selected; the whole photograph is exported as one page.
    WholeImageFallback,
    /// The color-card patch could not be measured; an earlier or the
    /// default correction is used instead.
    CalibrationSkipped { reason: String },
}

impl std::fmt::Display for PhotoWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PageCount { found, expected } => {
                write!(f, "{found} pages found ({expected} expected)")
            }
            Self::WholeImageFallback => write!(f, "no page selected, exporting whole image"),
            Self::CalibrationSkipped { reason } => write!(f, "color patch not usable: {reason}"),
        }
    }
}

/// Exposure settings read from the photograph's EXIF block.
///
/// Extraction is done by the image source; the engine only reads the
/// exposure time when propagating a calibration to later photographs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExposureInfo {
    /// Shutter time in seconds.
    #[serde(default)]
    pub exposure_time: Option<f64>,
    #[serde(default)]
    pub iso: Option<u32>,
    /// Aperture f-number.
    #[serde(default)]
    pub aperture: Option<f64>,
}

/// White-balance and exposure correction derived from a color-card patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCorrection {
    /// Per-channel (R, G, B) gains in linear space; the weakest is 1.0.
    pub white_balance: [f64; 3],
    /// Linear gain applied on top of white balance.
    pub exposure: f64,
    /// Exposure metadata of the photograph the patch was measured on.
    pub source_exif: ExposureInfo,
    /// Image path of the calibration photograph, `None` for the configured
    /// default.
    pub origin: Option<String>,
}

impl ColorCorrection {
    /// Correction that leaves every pixel unchanged.
    pub fn identity() -> Self {
        Self {
            white_balance: [1.0; 3],
            exposure: 1.0,
            source_exif: ExposureInfo::default(),
            origin: None,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.white_balance.iter().all(|f| (f - 1.0).abs() < 1e-9) && (self.exposure - 1.0).abs() < 1e-9
    }

    /// Combined linear gain for one channel.
    pub fn gain(&self, channel: usize) -> f64 {
        self.white_balance[channel] * self.exposure
    }
}
