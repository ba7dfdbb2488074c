// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-batch — Runs the page pipeline over a folder of photographs.
//
// Pages are selected in parallel, calibrations are propagated and pages
// numbered in folder order, then pages are extracted and written in
// parallel. Inputs and outputs go through the collaborator traits in
// `source`; `LocalStore` implements them on a directory.

pub mod local;
pub mod naming;
pub mod report;
pub mod runner;
pub mod source;

pub use local::LocalStore;
pub use naming::{Resequencer, output_name, page_suffix};
pub use report::{BatchReport, PhotoFailure, PhotoNote};
pub use runner::BatchRunner;
pub use source::{AnnotationSource, ArtifactSink, ImageProbe, ImageSource, LoadedImage};
