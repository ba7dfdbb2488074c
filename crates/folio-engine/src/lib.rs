// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-engine — Page selection and extraction for photographed manuscript
// spreads.
//
// Builds annotations from segmentation-oracle masks, selects and orders the
// real pages among them (recovering merged and split detections), trims
// margin strips, extracts de-skewed page images, and derives color
// corrections from color-card patches.

pub mod color;
pub mod extract;
pub mod geometry;
pub mod observer;
pub mod oracle;
pub mod pipeline;
pub mod select;
pub mod trim;

pub use color::{CalibrationChain, ColorCalibrator, apply_correction};
pub use extract::{PageExtractor, rotate_quarter};
pub use geometry::{Annotation, GeometryBuilder};
pub use observer::{NoopObserver, PipelineObserver, TracingObserver};
pub use oracle::{OracleMask, OracleOutput};
pub use pipeline::{Page, PagePipeline, PhotoAnalysis};
