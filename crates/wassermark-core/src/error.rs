// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Wassermark.

use thiserror::Error;

/// Top-level error type for all Wassermark operations.
#[derive(Debug, Error)]
pub enum WassermarkError {
    // -- Configuration errors --
    /// Invalid watermark configuration. Surfaced to the caller before any
    /// rendering happens; values are never silently clamped.
    #[error("invalid watermark configuration: {0}")]
    Config(String),

    // -- Source errors --
    /// File type not recognized, or the bytes could not be decoded as the
    /// declared type. Scoped to the single file; never aborts a batch.
    #[error("unsupported source file: {0}")]
    UnsupportedSource(String),

    // -- Rendering errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("text rendering failed: {0}")]
    Render(String),

    // -- Export errors --
    /// The rendering worker returned a failure or became unreachable.
    /// Recorded as a failed per-file result; the batch continues.
    #[error("worker failure: {0}")]
    Worker(String),

    // -- Storage / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WassermarkError>;
