// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output bundle — materializes a batch report's successful results as files
// on disk, one per source, named with the watermarked_ prefix.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use wassermark_core::error::Result;
use wassermark_core::types::{BatchReport, ExportOutcome};

/// Write every successful result in `report` to `dir`, creating the
/// directory if needed. Failed results are skipped; the report itself stays
/// the canonical record of what succeeded and what did not.
///
/// Returns the written paths in result order.
#[instrument(skip(report), fields(dir = %dir.as_ref().display()))]
pub fn write_bundle(report: &BatchReport, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for result in &report.results {
        if let ExportOutcome::Success { bytes, .. } = &result.outcome {
            let path = dir.join(&result.output_name);
            std::fs::write(&path, bytes)?;
            written.push(path);
        }
    }

    info!(
        written = written.len(),
        skipped = report.results.len() - written.len(),
        "bundle written"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wassermark_core::types::{ExportResult, SourceFile, SourceKind};

    #[test]
    fn writes_successes_and_skips_failures() {
        let img = SourceFile::new("a.png", SourceKind::Image, vec![0]);
        let pdf = SourceFile::new("b.pdf", SourceKind::Document, vec![1]);
        let now = Utc::now();
        let report = BatchReport {
            results: vec![
                ExportResult::success(&img, vec![9, 9, 9], "image/png"),
                ExportResult::failure(&pdf, "worker failure"),
            ],
            started_at: now,
            finished_at: now,
        };

        let dir = tempfile::tempdir().unwrap();
        let written = write_bundle(&report, dir.path()).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(
            written[0].file_name().unwrap().to_str().unwrap(),
            "watermarked_a.png"
        );
        assert_eq!(std::fs::read(&written[0]).unwrap(), vec![9, 9, 9]);
        assert!(!dir.path().join("watermarked_b.pdf").exists());
    }

    #[test]
    fn creates_the_target_directory() {
        let now = Utc::now();
        let report = BatchReport {
            results: Vec::new(),
            started_at: now,
            finished_at: now,
        };

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("run-1");
        let written = write_bundle(&report, &nested).unwrap();
        assert!(written.is_empty());
        assert!(nested.is_dir());
    }
}
