// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Rectify.

use thiserror::Error;

/// Top-level error type for all Rectify operations.
///
/// A failed corner detection is not an error: it is reported through
/// `DetectionResult::success`.
#[derive(Debug, Error)]
pub enum RectifyError {
    // -- Caller input --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("degenerate corner geometry: {0}")]
    DegenerateGeometry(String),

    // -- Image files --
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image metadata error: {0}")]
    Metadata(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RectifyError>;
