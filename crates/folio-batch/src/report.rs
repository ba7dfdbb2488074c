// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch report — summary of one run, serialisable for the CLI.

use chrono::{DateTime, Utc};
use folio_core::PhotoWarning;
use serde::Serialize;
use uuid::Uuid;

/// A photograph that was skipped because of a recoverable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoFailure {
    pub img_path: String,
    pub error: String,
}

/// A photograph-level QC warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoNote {
    pub img_path: String,
    pub warning: PhotoWarning,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub photos: usize,
    pub hidden: usize,
    /// Photographs run through the selection engine in this batch.
    pub analysed: usize,
    /// Photographs whose outputs all existed already.
    pub skipped_existing: usize,
    pub pages_written: usize,
    pub failures: Vec<PhotoFailure>,
    pub warnings: Vec<PhotoNote>,
}

impl BatchReport {
    pub fn new(run_id: Uuid, photos: usize) -> Self {
        Self {
            run_id,
            started: Utc::now(),
            finished: None,
            photos,
            hidden: 0,
            analysed: 0,
            skipped_existing: 0,
            pages_written: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
