// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-photograph pipeline: oracle masks in, ordered pages out.
//
//   masks -> GeometryBuilder -> CandidateFilter -> UnionResolver
//         -> order_by_reading -> BorderTrimmer (optional) -> pages

use std::sync::Arc;

use folio_core::config::FolioConfig;
use folio_core::{BoundingBox, OrientedRect, PageRecord, PhotoWarning, Rotation, Warning};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{Annotation, GeometryBuilder};
use crate::observer::{PipelineObserver, TracingObserver};
use crate::oracle::OracleOutput;
use crate::select::{CandidateFilter, ReadingDirection, UnionResolver, order_by_reading};
use crate::trim::BorderTrimmer;

/// A selected page in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based position on the photograph.
    pub position: usize,
    /// Final rectangle; differs from the annotation's own when trimmed.
    pub rect: OrientedRect,
    /// Bounding box of the source annotation.
    pub bbox: BoundingBox,
    pub warnings: Vec<Warning>,
}

impl Page {
    pub fn to_record(&self) -> PageRecord {
        PageRecord::new(self.rect, self.warnings.clone())
    }
}

/// Everything the pipeline found on one photograph.
#[derive(Debug, Clone, Default)]
pub struct PhotoAnalysis {
    pub pages: Vec<Page>,
    pub warnings: Vec<PhotoWarning>,
    pub direction: Option<ReadingDirection>,
    /// Masks that produced a usable annotation.
    pub annotations: usize,
}

impl PhotoAnalysis {
    pub fn page_records(&self) -> Vec<PageRecord> {
        self.pages.iter().map(Page::to_record).collect()
    }
}

/// The selection engine for one photograph at a time. Cheap to share
/// between workers.
#[derive(Clone)]
pub struct PagePipeline {
    config: FolioConfig,
    builder: GeometryBuilder,
    observer: Arc<dyn PipelineObserver>,
}

impl PagePipeline {
    pub fn new(config: FolioConfig) -> Self {
        let builder = GeometryBuilder::new(config.geometry.clone());
        Self {
            config,
            builder,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Select and order the pages of a `width` x `height` photograph
    /// (dimensions after `rotation`).
    #[instrument(skip(self, oracle), fields(masks = oracle.masks.len()))]
    pub fn analyze(&self, oracle: &OracleOutput, rotation: Rotation, width: u32, height: u32) -> PhotoAnalysis {
        let annotations: Vec<Annotation> = oracle
            .masks
            .iter()
            .enumerate()
            .filter_map(|(i, mask)| match self.builder.build(mask, rotation, width, height) {
                Ok(a) => Some(a),
                Err(err) => {
                    debug!(mask = i, %err, "Mask skipped");
                    None
                }
            })
            .collect();

        let observer = self.observer.as_ref();
        let selection = CandidateFilter::new(&self.config.selection, observer).select(&annotations);
        let mut chosen = UnionResolver::new(&self.config.resolver, observer).resolve(selection);
        let direction = order_by_reading(&mut chosen, |c| c.annotation.oriented_rect().center);

        let trimmer = BorderTrimmer::new(&self.config.trim);
        let pages: Vec<Page> = chosen
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let mut warnings = candidate.warnings;
                let rect = if self.config.trim.enabled {
                    let (rect, trim_warnings) = trimmer.trim(candidate.annotation.oriented_rect(), &annotations);
                    warnings.extend(trim_warnings);
                    rect
                } else {
                    *candidate.annotation.oriented_rect()
                };
                Page {
                    position: i + 1,
                    rect,
                    bbox: *candidate.annotation.bbox(),
                    warnings,
                }
            })
            .collect();

        let expected = self.config.selection.expected_page_count;
        let mut warnings = Vec::new();
        if pages.len() != expected {
            warn!(found = pages.len(), expected, "Unexpected page count");
            warnings.push(PhotoWarning::PageCount {
                found: pages.len(),
                expected,
            });
        }
        if pages.is_empty() {
            warnings.push(PhotoWarning::WholeImageFallback);
        }
        info!(pages = pages.len(), ?direction, "Photograph analysed");

        PhotoAnalysis {
            pages,
            warnings,
            direction,
            annotations: annotations.len(),
        }
    }
}
