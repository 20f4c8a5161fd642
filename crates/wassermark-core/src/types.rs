// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Wassermark batch export engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unique identifier for a queued source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input kinds.
///
/// Images are stamped locally on an offscreen raster surface; documents are
/// handed to the PDF rendering worker page by page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Image,
    Document,
}

impl SourceKind {
    /// Classify a declared MIME type. `image/*` maps to `Image`,
    /// `application/pdf` to `Document`; anything else is unsupported.
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime == "application/pdf" {
            Some(Self::Document)
        } else {
            None
        }
    }

    /// Infer the kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tif" | "tiff" => Some(Self::Image),
            "pdf" => Some(Self::Document),
            _ => None,
        }
    }
}

/// One user-selected file, immutable once loaded.
///
/// The raw bytes are read exactly once at selection time; the content hash is
/// computed eagerly so results can be traced back to their input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: SourceId,
    pub name: String,
    pub kind: SourceKind,
    pub bytes: Vec<u8>,
    /// SHA-256 hash of `bytes`, hex-encoded.
    pub content_hash: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, kind: SourceKind, bytes: Vec<u8>) -> Self {
        let content_hash = hex::encode(Sha256::digest(&bytes));
        Self {
            id: SourceId::new(),
            name: name.into(),
            kind,
            bytes,
            content_hash,
        }
    }

    /// Classify by declared MIME type, rejecting unsupported types at load
    /// time.
    pub fn from_mime(
        name: impl Into<String>,
        mime: &str,
        bytes: Vec<u8>,
    ) -> crate::error::Result<Self> {
        let kind = SourceKind::from_mime(mime).ok_or_else(|| {
            crate::error::WassermarkError::UnsupportedSource(format!(
                "unrecognized MIME type: {mime}"
            ))
        })?;
        Ok(Self::new(name, kind, bytes))
    }
}

/// Ordered queue of source files.
///
/// Owned by the caller between runs (append/remove/clear); a batch run takes
/// a snapshot slice and the queue must not be mutated while the run is in
/// flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceQueue {
    files: Vec<SourceFile>,
}

impl SourceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    /// Remove a file by id. Returns `true` if a file was removed.
    pub fn remove(&mut self, id: SourceId) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        self.files.len() != before
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file shown in the live preview (first in queue order).
    pub fn first(&self) -> Option<&SourceFile> {
        self.files.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    pub fn as_slice(&self) -> &[SourceFile] {
        &self.files
    }
}

/// Fixed prefix applied to every output file name.
pub const OUTPUT_NAME_PREFIX: &str = "watermarked_";

/// Outcome of exporting one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportOutcome {
    Success {
        bytes: Vec<u8>,
        mime: String,
    },
    Failure {
        reason: String,
    },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Produced exactly once per queued file during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    pub source_id: SourceId,
    /// Original file name prefixed with [`OUTPUT_NAME_PREFIX`].
    pub output_name: String,
    pub outcome: ExportOutcome,
}

impl ExportResult {
    pub fn success(file: &SourceFile, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            source_id: file.id,
            output_name: format!("{OUTPUT_NAME_PREFIX}{}", file.name),
            outcome: ExportOutcome::Success {
                bytes,
                mime: mime.into(),
            },
        }
    }

    pub fn failure(file: &SourceFile, reason: impl Into<String>) -> Self {
        Self {
            source_id: file.id,
            output_name: format!("{OUTPUT_NAME_PREFIX}{}", file.name),
            outcome: ExportOutcome::Failure {
                reason: reason.into(),
            },
        }
    }
}

/// Summary of one complete batch export run.
///
/// The run is complete when every queued file has a corresponding result, in
/// queue order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ExportResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
