// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch export coordinator — drives one complete export run over a file
// queue snapshot with a single frozen config.
//
// Documents go to the rendering worker, images are stamped locally on an
// offscreen surface. Per-file errors become failed results; nothing short of
// an invalid config aborts the run, and that is rejected before any work
// starts.

use std::io::Cursor;

use chrono::Utc;
use image::{ImageFormat, RgbaImage};
use tracing::{info, instrument, warn};
use wassermark_core::config::WatermarkConfig;
use wassermark_core::error::{Result, WassermarkError};
use wassermark_core::types::{BatchReport, ExportResult, SourceFile, SourceKind};
use wassermark_document::loader;
use wassermark_render::stamp::stamp_image;

use crate::protocol::StampResponse;
use crate::worker::PdfWorker;

/// Run one batch export over `files` with a frozen `config` snapshot.
///
/// The queue slice is processed strictly in order and yields exactly one
/// [`ExportResult`] per file, in the same order. The rendering worker is
/// acquired at run start, used exclusively by this run, and terminated on
/// every exit path.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn run_batch(files: &[SourceFile], config: &WatermarkConfig) -> Result<BatchReport> {
    // The only hard, synchronous failure: a bad config is surfaced before
    // any rendering or worker spawn.
    config.validate()?;

    let started_at = Utc::now();
    let mut worker = PdfWorker::spawn();
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let result = export_one(&mut worker, file, config).await;
        if !result.outcome.is_success() {
            warn!(name = %file.name, "file export failed");
        }
        results.push(result);
    }

    // No early exits between spawn and here; the Drop impl on PdfWorker
    // covers panic unwinds.
    worker.shutdown().await;

    let report = BatchReport {
        results,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        total = report.results.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch export complete"
    );
    Ok(report)
}

/// Export a single file; all failures are captured in the result.
async fn export_one(
    worker: &mut PdfWorker,
    file: &SourceFile,
    config: &WatermarkConfig,
) -> ExportResult {
    match file.kind {
        SourceKind::Document => {
            match worker.stamp(file.bytes.clone(), config.clone()).await {
                StampResponse::Document(bytes) => {
                    ExportResult::success(file, bytes, "application/pdf")
                }
                StampResponse::Failed(reason) => ExportResult::failure(file, reason),
            }
        }
        SourceKind::Image => {
            let owned_file = file.clone();
            let owned_config = config.clone();
            let rendered = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, &'static str)> {
                let mut surface = loader::load_full_image(&owned_file)?;
                stamp_image(&mut surface, &owned_config)?;
                encode_surface(&surface, &owned_file.name)
            })
            .await;

            match rendered {
                Ok(Ok((bytes, mime))) => ExportResult::success(file, bytes, mime),
                Ok(Err(err)) => ExportResult::failure(file, err.to_string()),
                Err(join_err) => {
                    ExportResult::failure(file, format!("image render task failed: {join_err}"))
                }
            }
        }
    }
}

/// Encode a stamped surface back to bytes, keeping JPEG sources as JPEG and
/// everything else as PNG (which preserves alpha).
fn encode_surface(surface: &RgbaImage, name: &str) -> Result<(Vec<u8>, &'static str)> {
    let jpeg = std::path::Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false);

    let mut bytes = Vec::new();
    if jpeg {
        let rgb = image::DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
        let mut cursor = Cursor::new(&mut bytes);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, 90);
        rgb.write_with_encoder(encoder)
            .map_err(|err| WassermarkError::Image(format!("JPEG encoding failed: {err}")))?;
        Ok((bytes, "image/jpeg"))
    } else {
        surface
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| WassermarkError::Image(format!("PNG encoding failed: {err}")))?;
        Ok((bytes, "image/png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{minimal_pdf, png_source};
    use wassermark_core::types::ExportOutcome;

    fn document_source(name: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile::new(name, SourceKind::Document, bytes)
    }

    #[tokio::test]
    async fn mixed_batch_isolates_the_failing_document() {
        // One good image, one document the worker will fail on.
        let files = vec![
            png_source("photo.png", 200, 150),
            document_source("broken.pdf", b"not a pdf".to_vec()),
        ];

        let report = run_batch(&files, &WatermarkConfig::default())
            .await
            .expect("run completes");

        assert_eq!(report.results.len(), 2);
        assert!(report.results[0].outcome.is_success());
        assert!(!report.results[1].outcome.is_success());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn results_preserve_queue_order() {
        let files = vec![
            document_source("a.pdf", minimal_pdf(1)),
            document_source("b.pdf", b"junk".to_vec()),
            png_source("c.png", 100, 100),
            document_source("d.pdf", minimal_pdf(2)),
        ];

        let report = run_batch(&files, &WatermarkConfig::default())
            .await
            .unwrap();

        assert_eq!(report.results.len(), 4);
        for (result, file) in report.results.iter().zip(&files) {
            assert_eq!(result.source_id, file.id);
            assert_eq!(result.output_name, format!("watermarked_{}", file.name));
        }
        // Only the corrupt document failed.
        assert!(report.results[0].outcome.is_success());
        assert!(!report.results[1].outcome.is_success());
        assert!(report.results[2].outcome.is_success());
        assert!(report.results[3].outcome.is_success());
    }

    #[tokio::test]
    async fn all_failures_still_complete_the_run() {
        let files = vec![
            document_source("x.pdf", b"x".to_vec()),
            document_source("y.pdf", b"y".to_vec()),
        ];

        let report = run_batch(&files, &WatermarkConfig::default())
            .await
            .unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failed(), 2);

        // And a fresh run afterwards works: the previous run released its
        // worker instead of leaking it.
        let files = vec![document_source("z.pdf", minimal_pdf(1))];
        let report = run_batch(&files, &WatermarkConfig::default())
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn invalid_config_rejected_before_any_work() {
        let config = WatermarkConfig {
            opacity: 7.0,
            ..Default::default()
        };
        let files = vec![png_source("photo.png", 50, 50)];

        let result = run_batch(&files, &config).await;
        assert!(matches!(result, Err(WassermarkError::Config(_))));
    }

    #[tokio::test]
    async fn empty_queue_yields_empty_report() {
        let report = run_batch(&[], &WatermarkConfig::default()).await.unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.succeeded(), 0);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn image_results_decode_to_the_source_dimensions() {
        let files = vec![png_source("photo.png", 320, 200)];
        let report = run_batch(&files, &WatermarkConfig::default())
            .await
            .unwrap();

        match &report.results[0].outcome {
            ExportOutcome::Success { bytes, mime } => {
                assert_eq!(mime, "image/png");
                let decoded = image::load_from_memory(bytes).unwrap();
                assert_eq!(decoded.width(), 320);
                assert_eq!(decoded.height(), 200);
            }
            ExportOutcome::Failure { reason } => panic!("export failed: {reason}"),
        }
    }

    #[tokio::test]
    async fn jpeg_sources_are_reencoded_as_jpeg() {
        let mut file = png_source("photo.jpg", 64, 64);
        // Re-tag the PNG bytes with a JPEG name: encoding choice follows
        // the output name, decoding sniffs the actual bytes.
        file.name = "photo.jpg".to_string();

        let report = run_batch(&[file], &WatermarkConfig::default())
            .await
            .unwrap();
        match &report.results[0].outcome {
            ExportOutcome::Success { mime, bytes } => {
                assert_eq!(mime, "image/jpeg");
                // JPEG SOI marker: the encoder really wrote into the buffer.
                assert_eq!(&bytes[..2], &[0xff, 0xd8]);
                assert!(image::load_from_memory(bytes).is_ok());
            }
            ExportOutcome::Failure { reason } => panic!("export failed: {reason}"),
        }
    }
}
