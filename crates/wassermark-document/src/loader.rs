// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source loader — normalizes heterogeneous input files into a renderable
// surface plus page metadata.
//
// Preview and export use independently sized surfaces: the preview is
// downscaled to a bounded width, while export re-decodes the source at full
// resolution. Watermark placement is percentage-based, so both end up
// visually identical.

use image::RgbaImage;
use lopdf::Document;
use tracing::{debug, info, instrument};
use wassermark_core::error::{Result, WassermarkError};
use wassermark_core::types::{SourceFile, SourceKind};

/// Maximum width of a preview surface, in pixels.
pub const PREVIEW_MAX_WIDTH: u32 = 600;

/// A source file decoded far enough to preview.
#[derive(Debug)]
pub struct LoadedPreview {
    /// Preview-sized surface: the decoded image, or a blank page-sized
    /// stand-in for documents.
    pub surface: RgbaImage,
    /// Total pages; always 1 for images. Document pages beyond the first are
    /// only materialized at export time.
    pub page_count: u32,
    pub kind: SourceKind,
}

/// Decode a source file into a preview surface.
///
/// Images are decoded and downscaled to at most [`PREVIEW_MAX_WIDTH`] wide,
/// preserving aspect ratio. Documents are opened only far enough to read the
/// first page's dimensions; the preview surface is a white page of that size.
/// Corrupt bytes or a kind/content mismatch fail with `UnsupportedSource`;
/// the loader does not retry.
#[instrument(skip(file), fields(name = %file.name, kind = ?file.kind))]
pub fn load_preview(file: &SourceFile) -> Result<LoadedPreview> {
    match file.kind {
        SourceKind::Image => {
            let decoded = image::load_from_memory(&file.bytes).map_err(|err| {
                WassermarkError::UnsupportedSource(format!(
                    "cannot decode {} as an image: {err}",
                    file.name
                ))
            })?;

            let surface = if decoded.width() > PREVIEW_MAX_WIDTH {
                let scale = PREVIEW_MAX_WIDTH as f32 / decoded.width() as f32;
                let height = (decoded.height() as f32 * scale).round().max(1.0) as u32;
                decoded
                    .resize(
                        PREVIEW_MAX_WIDTH,
                        height,
                        image::imageops::FilterType::Lanczos3,
                    )
                    .to_rgba8()
            } else {
                decoded.to_rgba8()
            };

            info!(
                width = surface.width(),
                height = surface.height(),
                "image preview loaded"
            );
            Ok(LoadedPreview {
                surface,
                page_count: 1,
                kind: SourceKind::Image,
            })
        }
        SourceKind::Document => {
            let doc = Document::load_mem(&file.bytes).map_err(|err| {
                WassermarkError::UnsupportedSource(format!(
                    "cannot open {} as a PDF: {err}",
                    file.name
                ))
            })?;

            let pages = doc.get_pages();
            let page_count = pages.len() as u32;
            let (width, height) = match pages.values().next() {
                Some(&first_page) => crate::pdf::page_size(&doc, first_page)?,
                None => {
                    return Err(WassermarkError::UnsupportedSource(format!(
                        "{} contains no pages",
                        file.name
                    )));
                }
            };

            // Placement preview: a white page at the document's first-page
            // dimensions. Full PDF rasterization is out of scope.
            let surface = RgbaImage::from_pixel(
                width.round().max(1.0) as u32,
                height.round().max(1.0) as u32,
                image::Rgba([255, 255, 255, 255]),
            );

            debug!(page_count, width, height, "document preview loaded");
            Ok(LoadedPreview {
                surface,
                page_count,
                kind: SourceKind::Document,
            })
        }
    }
}

/// Decode an image source at full resolution for the export path.
///
/// Independent of any preview decode; document files never come through
/// here, they are stamped by the rendering worker instead.
#[instrument(skip(file), fields(name = %file.name))]
pub fn load_full_image(file: &SourceFile) -> Result<RgbaImage> {
    if file.kind != SourceKind::Image {
        return Err(WassermarkError::UnsupportedSource(format!(
            "{} is not an image source",
            file.name
        )));
    }

    let decoded = image::load_from_memory(&file.bytes).map_err(|err| {
        WassermarkError::UnsupportedSource(format!(
            "cannot decode {} as an image: {err}",
            file.name
        ))
    })?;

    debug!(
        width = decoded.width(),
        height = decoded.height(),
        "full-resolution image loaded"
    );
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode test PNG");
        bytes
    }

    #[test]
    fn small_image_previews_at_native_size() {
        let file = SourceFile::new("small.png", SourceKind::Image, png_bytes(320, 240));
        let preview = load_preview(&file).unwrap();
        assert_eq!(preview.surface.width(), 320);
        assert_eq!(preview.surface.height(), 240);
        assert_eq!(preview.page_count, 1);
    }

    #[test]
    fn wide_image_is_downscaled_preserving_aspect() {
        let file = SourceFile::new("wide.png", SourceKind::Image, png_bytes(1200, 600));
        let preview = load_preview(&file).unwrap();
        assert_eq!(preview.surface.width(), PREVIEW_MAX_WIDTH);
        assert_eq!(preview.surface.height(), 300);
    }

    #[test]
    fn full_image_decode_is_native_resolution() {
        let file = SourceFile::new("big.png", SourceKind::Image, png_bytes(1200, 900));
        let full = load_full_image(&file).unwrap();
        assert_eq!(full.width(), 1200);
        assert_eq!(full.height(), 900);
    }

    #[test]
    fn corrupt_image_bytes_are_unsupported() {
        let file = SourceFile::new("junk.png", SourceKind::Image, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            load_preview(&file),
            Err(WassermarkError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn corrupt_document_bytes_are_unsupported() {
        let file = SourceFile::new("junk.pdf", SourceKind::Document, b"not a pdf".to_vec());
        assert!(matches!(
            load_preview(&file),
            Err(WassermarkError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn document_preview_reports_page_count_and_page_size() {
        let bytes = crate::pdf::tests_support::minimal_pdf(3, 612.0, 792.0);
        let file = SourceFile::new("doc.pdf", SourceKind::Document, bytes);

        let preview = load_preview(&file).unwrap();
        assert_eq!(preview.page_count, 3);
        assert_eq!(preview.surface.width(), 612);
        assert_eq!(preview.surface.height(), 792);
        // Blank white stand-in page.
        assert!(preview.surface.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn load_full_image_rejects_documents() {
        let bytes = crate::pdf::tests_support::minimal_pdf(1, 612.0, 792.0);
        let file = SourceFile::new("doc.pdf", SourceKind::Document, bytes);
        assert!(load_full_image(&file).is_err());
    }
}
