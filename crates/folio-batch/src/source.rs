// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator interfaces of the batch runner: where oracle output and
// photographs come from, and where extracted pages go.

use folio_core::error::Result;
use folio_core::{ExposureInfo, PhotoRecord};
use folio_engine::OracleOutput;
use image::DynamicImage;

/// Cheap metadata about a photograph, read without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProbe {
    /// Stored width, before any pre-rotation.
    pub width: u32,
    /// Stored height, before any pre-rotation.
    pub height: u32,
    pub exposure: ExposureInfo,
}

/// A decoded photograph, before pre-rotation.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub exposure: ExposureInfo,
    /// The source is black-and-white only.
    pub bilevel: bool,
}

/// Segmentation-oracle output per photograph.
pub trait AnnotationSource: Send + Sync {
    /// `Ok(None)` when the oracle has nothing for this photograph.
    fn load(&self, photo: &PhotoRecord) -> Result<Option<OracleOutput>>;

    /// Output of a second, denser oracle pass, consulted when the first
    /// one yields the wrong number of pages.
    fn load_dense(&self, _photo: &PhotoRecord) -> Result<Option<OracleOutput>> {
        Ok(None)
    }
}

/// Source photographs.
///
/// Unreadable or missing images are reported as `Ok(None)`, never as an
/// error.
pub trait ImageSource: Send + Sync {
    fn probe(&self, photo: &PhotoRecord) -> Result<Option<ImageProbe>>;

    fn load(&self, photo: &PhotoRecord) -> Result<Option<LoadedImage>>;
}

/// Destination of extracted pages, addressed by relative name.
pub trait ArtifactSink: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn write(&self, name: &str, image: &DynamicImage) -> Result<()>;
}
