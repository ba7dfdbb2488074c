// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output contract of the segmentation oracle.

use folio_core::CropWindow;
use image::GrayImage;

/// One candidate region reported by the oracle.
#[derive(Debug, Clone)]
pub struct OracleMask {
    /// Binary mask at the oracle's working resolution; any non-zero pixel
    /// is foreground.
    pub mask: GrayImage,
    /// Sampling window the candidate was found in, in working-resolution
    /// pixels of the unrotated photograph.
    pub crop_window: CropWindow,
    /// Area reported by the oracle. Informational only; the engine uses the
    /// area of the dominant contour instead.
    pub area: Option<u64>,
}

impl OracleMask {
    pub fn new(mask: GrayImage, crop_window: CropWindow) -> Self {
        Self {
            mask,
            crop_window,
            area: None,
        }
    }
}

/// Every candidate the oracle produced for one photograph.
#[derive(Debug, Clone, Default)]
pub struct OracleOutput {
    pub masks: Vec<OracleMask>,
}

impl OracleOutput {
    pub fn new(masks: Vec<OracleMask>) -> Self {
        Self { masks }
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
