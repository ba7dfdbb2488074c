// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Union/split resolver — decides whether queued fragments replace the
// accepted pages because together they rebuild a page the oracle merged.

use folio_core::BoundingBox;
use folio_core::config::ResolverPolicy;
use tracing::debug;

use super::filter::{Candidate, Selection};
use crate::observer::{PipelineObserver, SelectionRole};

pub struct UnionResolver<'p> {
    policy: &'p ResolverPolicy,
    observer: &'p dyn PipelineObserver,
}

impl<'p> UnionResolver<'p> {
    pub fn new(policy: &'p ResolverPolicy, observer: &'p dyn PipelineObserver) -> Self {
        Self { policy, observer }
    }

    /// Final page set of one photograph.
    pub fn resolve<'a>(&self, selection: Selection<'a>) -> Vec<Candidate<'a>> {
        let Selection {
            accepted,
            fragments,
        } = selection;
        if fragments.is_empty() {
            return accepted;
        }
        let promote = match accepted.first() {
            None => true,
            Some(first) => {
                let boxes: Vec<BoundingBox> =
                    fragments.iter().map(|f| *f.annotation.bbox()).collect();
                self.rebuilds(&boxes, first.annotation.bbox())
            }
        };
        if !promote {
            return accepted;
        }
        debug!(
            fragments = fragments.len(),
            replaced = accepted.len(),
            "Fragments promoted to pages"
        );
        for f in &fragments {
            self.observer.on_selected(f.index, SelectionRole::PromotedFragment);
        }
        fragments
    }

    /// Whether `fragments` are mostly disjoint pieces whose union box
    /// matches `page`.
    pub fn rebuilds(&self, fragments: &[BoundingBox], page: &BoundingBox) -> bool {
        let Some((first, rest)) = fragments.split_first() else {
            return false;
        };
        let union = rest.iter().fold(*first, |acc, b| acc.hull(b));
        let common = rest
            .iter()
            .try_fold(*first, |acc, b| acc.intersection(b));
        let overlap = common.map_or(0, |b| b.area()) as f64 / union.area().max(1) as f64;
        let iou = union.iou(page);
        debug!(overlap, iou, "Fragment union checked");
        overlap <= self.policy.max_fragment_overlap && iou > self.policy.min_union_iou
    }
}
