// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry module — mask to annotation, hull and rectangle fitting.

pub mod annotation;
pub mod hull;

pub use annotation::{Annotation, GeometryBuilder};
