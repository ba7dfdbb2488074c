// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Geometry errors --
    #[error("mask contains no contour")]
    EmptyMask,

    #[error("image {path} is {actual_width}x{actual_height}, record says {expected_width}x{expected_height}")]
    DimensionMismatch {
        path: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    // -- Input errors --
    #[error("source image missing or unreadable: {0}")]
    MissingImage(String),

    #[error("no oracle annotations for {0}")]
    MissingAnnotations(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("color calibration failed: {0}")]
    Calibration(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Batch execution --
    #[error("worker task failed: {0}")]
    TaskJoin(String),

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl FolioError {
    /// Whether the error only affects the photograph being processed.
    ///
    /// Recoverable errors are logged and the batch moves on to the next
    /// photograph; anything else aborts the whole batch.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::TaskJoin(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_photo_errors_are_recoverable() {
        assert!(FolioError::EmptyMask.is_recoverable());
        assert!(FolioError::MissingImage("a.jpg".into()).is_recoverable());
        assert!(
            FolioError::DimensionMismatch {
                path: "a.jpg".into(),
                expected_width: 10,
                expected_height: 10,
                actual_width: 12,
                actual_height: 10,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn config_errors_abort() {
        assert!(!FolioError::InvalidConfig("concurrency is zero".into()).is_recoverable());
        assert!(!FolioError::TaskJoin("semaphore closed".into()).is_recoverable());
    }

    #[test]
    fn worker_panic_only_skips_its_photograph() {
        assert!(FolioError::WorkerPanicked("index out of bounds".into()).is_recoverable());
    }
}
