// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Candidate filter — scans annotations from largest to smallest and sorts
// them into accepted pages, potential split fragments, and rejects.

use folio_core::Warning;
use folio_core::config::SelectionPolicy;
use tracing::{debug, instrument};

use crate::geometry::Annotation;
use crate::observer::{PipelineObserver, RejectReason, SelectionRole};

/// An annotation kept by the filter, with the warnings it earned.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Position in the annotation list handed to the filter.
    pub index: usize,
    pub annotation: &'a Annotation,
    pub warnings: Vec<Warning>,
}

/// Result of one filter pass.
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    pub accepted: Vec<Candidate<'a>>,
    pub fragments: Vec<Candidate<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RatioFit {
    Strict,
    Tolerated,
    Outside,
}

/// Applies a [`SelectionPolicy`] to the annotations of one photograph.
pub struct CandidateFilter<'p> {
    policy: &'p SelectionPolicy,
    observer: &'p dyn PipelineObserver,
}

impl<'p> CandidateFilter<'p> {
    pub fn new(policy: &'p SelectionPolicy, observer: &'p dyn PipelineObserver) -> Self {
        Self { policy, observer }
    }

    /// Run the filter. The input order only breaks ties between
    /// annotations of equal area.
    #[instrument(skip_all, fields(candidates = annotations.len()))]
    pub fn select<'a>(&self, annotations: &'a [Annotation]) -> Selection<'a> {
        let p = self.policy;
        let mut order: Vec<usize> = (0..annotations.len()).collect();
        order.sort_by(|&a, &b| {
            annotations[b]
                .contour_area()
                .total_cmp(&annotations[a].contour_area())
        });

        let mut selection = Selection::default();
        let mut reference_area: Option<f64> = None;

        for index in order {
            let ann = &annotations[index];
            self.observer.on_annotation(index, ann);

            let area_ratio = ann.area_ratio();
            if area_ratio < p.min_area_ratio {
                self.reject(index, RejectReason::TooSmall { area_ratio });
                break;
            }
            if ann.spans_frame(p.direction, p.edge_tolerance_px) {
                self.reject(index, RejectReason::SpansFrame);
                continue;
            }
            let edges = ann.edges_touched(p.edge_tolerance_px);
            if edges > 2 {
                self.reject(index, RejectReason::TouchesCropEdges { edges });
                continue;
            }
            let squarishness = ann.squarishness();
            if squarishness < p.squarishness_min {
                self.reject(index, RejectReason::LowSquarishness { value: squarishness });
                continue;
            }
            if let Some(iou) = duplicate_of(ann, &selection, p.duplicate_iou_threshold) {
                self.reject(index, RejectReason::Duplicate { iou });
                continue;
            }

            let mut warnings = Vec::new();
            if p.squarishness_warn.is_some_and(|warn| squarishness < warn) {
                warnings.push(Warning::LowSquarishness { value: squarishness });
            }
            let ratio = ann.aspect_ratio();
            let fit = self.ratio_fit(ratio);
            if fit == RatioFit::Tolerated {
                warnings.push(Warning::UnexpectedAspectRatio { value: ratio });
            }
            let candidate = Candidate {
                index,
                annotation: ann,
                warnings,
            };

            let Some(reference) = reference_area else {
                if fit == RatioFit::Outside {
                    self.reject(index, RejectReason::AspectRatio { value: ratio });
                    continue;
                }
                reference_area = Some(ann.contour_area());
                self.accept(&mut selection, candidate);
                continue;
            };

            if selection
                .fragments
                .iter()
                .any(|f| self.is_inside(ann, f.annotation))
            {
                self.reject(index, RejectReason::InsideFragment);
                continue;
            }

            let factor = if selection.accepted.len() < p.expected_page_count {
                p.size_factor_loose
            } else {
                p.size_factor_tight
            };
            let size_ok = (ann.contour_area() - reference).abs() / reference <= factor;
            let inside_page = selection
                .accepted
                .iter()
                .any(|a| self.is_inside(ann, a.annotation));

            if size_ok && !inside_page && fit != RatioFit::Outside {
                self.accept(&mut selection, candidate);
            } else if selection.accepted.len() < p.expected_page_count
                && selection.fragments.len() < p.expected_page_count
            {
                self.observer.on_selected(index, SelectionRole::Fragment);
                selection.fragments.push(candidate);
            } else {
                self.reject(index, RejectReason::Surplus);
            }
        }

        debug!(
            accepted = selection.accepted.len(),
            fragments = selection.fragments.len(),
            "Candidate filter finished"
        );
        selection
    }

    fn ratio_fit(&self, ratio: f64) -> RatioFit {
        let [lo, hi] = self.policy.aspect_ratio_range;
        if (lo..=hi).contains(&ratio) {
            return RatioFit::Strict;
        }
        match self.policy.aspect_ratio_warn_range {
            Some([lo, hi]) if (lo..=hi).contains(&ratio) => RatioFit::Tolerated,
            _ => RatioFit::Outside,
        }
    }

    fn is_inside(&self, inner: &Annotation, outer: &Annotation) -> bool {
        inner.bbox().fraction_inside(outer.bbox()) > 1.0 - self.policy.containment_slack
    }

    fn accept<'a>(&self, selection: &mut Selection<'a>, candidate: Candidate<'a>) {
        self.observer.on_selected(candidate.index, SelectionRole::Page);
        selection.accepted.push(candidate);
    }

    fn reject(&self, index: usize, reason: RejectReason) {
        self.observer.on_rejected(index, reason);
    }
}

/// IoU with the first accepted page or fragment above `threshold`.
fn duplicate_of(ann: &Annotation, selection: &Selection<'_>, threshold: f64) -> Option<f64> {
    selection
        .accepted
        .iter()
        .chain(selection.fragments.iter())
        .map(|c| ann.bbox().iou(c.annotation.bbox()))
        .find(|iou| *iou > threshold)
}
