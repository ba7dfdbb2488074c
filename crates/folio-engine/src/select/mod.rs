// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection: candidate filter, union/split resolver and page orderer.

pub mod filter;
pub mod order;
pub mod resolver;

pub use filter::{Candidate, CandidateFilter, Selection};
pub use order::{ReadingDirection, order_by_reading, reading_direction};
pub use resolver::UnionResolver;
