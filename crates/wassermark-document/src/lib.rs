// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wassermark-document — Source loading and PDF stamping for Wassermark.
//
// Provides the source loader (image decode with preview downscaling, PDF
// page metadata) and the PDF stamping path used by the rendering worker.

pub mod loader;
pub mod pdf;

pub use loader::{LoadedPreview, PREVIEW_MAX_WIDTH, load_full_image, load_preview};
pub use pdf::{page_count, stamp_pdf};
