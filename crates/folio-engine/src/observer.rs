// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline observer — debugging hook notified of every selection decision.

use tracing::debug;

use crate::geometry::Annotation;

/// Why the candidate filter dropped an annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Below the minimum area ratio; ends the scan.
    TooSmall { area_ratio: f64 },
    /// Covers the whole frame along the configured direction.
    SpansFrame,
    /// Close to more than two crop-window edges.
    TouchesCropEdges { edges: usize },
    LowSquarishness { value: f64 },
    /// Overlaps an accepted page or queued fragment.
    Duplicate { iou: f64 },
    /// First page candidate with an out-of-range aspect ratio.
    AspectRatio { value: f64 },
    /// Lies inside a queued fragment.
    InsideFragment,
    /// Neither page-sized nor needed as a fragment.
    Surplus,
}

/// What the filter or resolver did with an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRole {
    Page,
    Fragment,
    /// A fragment promoted to a page by the union resolver.
    PromotedFragment,
}

/// Receives selection events for one photograph. Every method defaults to
/// doing nothing.
pub trait PipelineObserver: Send + Sync {
    fn on_annotation(&self, _index: usize, _annotation: &Annotation) {}

    fn on_rejected(&self, _index: usize, _reason: RejectReason) {}

    fn on_selected(&self, _index: usize, _role: SelectionRole) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Logs every event at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_annotation(&self, index: usize, annotation: &Annotation) {
        debug!(
            index,
            area = annotation.contour_area(),
            bbox = ?annotation.bbox(),
            squarishness = annotation.squarishness(),
            "Candidate"
        );
    }

    fn on_rejected(&self, index: usize, reason: RejectReason) {
        debug!(index, ?reason, "Candidate rejected");
    }

    fn on_selected(&self, index: usize, role: SelectionRole) {
        debug!(index, ?role, "Candidate selected");
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Collects events for assertions.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub rejected: Mutex<Vec<(usize, RejectReason)>>,
        pub selected: Mutex<Vec<(usize, SelectionRole)>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn on_rejected(&self, index: usize, reason: RejectReason) {
            if let Ok(mut v) = self.rejected.lock() {
                v.push((index, reason));
            }
        }

        fn on_selected(&self, index: usize, role: SelectionRole) {
            if let Ok(mut v) = self.selected.lock() {
                v.push((index, role));
            }
        }
    }
}
