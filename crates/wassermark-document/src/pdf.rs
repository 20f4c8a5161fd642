// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page stamping — applies the watermark geometry to every page of an
// existing document by appending content streams, using `lopdf`.
//
// PDF user space has a bottom-left origin while the watermark config
// measures the Y percentage from the top of the surface. Every position is
// therefore flipped (`pdf_y = page_height - top_down_y`, the documented
// `effectiveY = 100 - yPercent` transform) so that the exported pages match
// the preview exactly.

use std::fmt::Write as _;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument};
use wassermark_core::config::{Rgb, WatermarkConfig};
use wassermark_core::error::{Result, WassermarkError};
use wassermark_render::geometry::{self, Placement, Point, SurfaceSize};
use wassermark_render::text;

/// Resource names registered on each stamped page.
const FONT_RESOURCE: &str = "WmFont";
const GS_RESOURCE: &str = "WmGS";

/// WinAnsi code range covered by the embedded font's Widths array;
/// `escape_pdf_text` folds everything outside it to '?'.
const PRINTABLE_FIRST: i64 = 32;
const PRINTABLE_LAST: i64 = 126;

/// Stamp the watermark onto every page of a PDF, returning the rebuilt
/// document's bytes.
///
/// One content stream is appended per page; existing page content is left
/// untouched underneath. Empty watermark text returns the document
/// re-serialized but visually unchanged.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn stamp_pdf(bytes: &[u8], config: &WatermarkConfig) -> Result<Vec<u8>> {
    config.validate()?;

    let mut doc = Document::load_mem(bytes)
        .map_err(|err| WassermarkError::Pdf(format!("failed to load PDF: {err}")))?;

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(WassermarkError::Pdf("document has no pages".to_string()));
    }

    let color = config.color()?;

    // Shared resources for all pages: the embedded preview font and an
    // ExtGState carrying the stroke/fill opacity.
    let font_id = embed_font(&mut doc);
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(config.opacity.into()),
        "CA" => Object::Real(config.opacity.into()),
    });

    let mut stamped_pages = 0usize;
    for page_id in pages {
        let (width, height) = page_size(&doc, page_id)?;
        let content = page_ops(config, width, height, color)?;
        let Some(content) = content else {
            // Empty text: nothing to stamp on any page.
            break;
        };

        let resources = stamped_resources(&doc, page_id, font_id, gs_id)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        append_page_content(&mut doc, page_id, resources, content_id)?;
        stamped_pages += 1;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| WassermarkError::Pdf(format!("failed to serialize stamped PDF: {err}")))?;

    info!(stamped_pages, output_bytes = output.len(), "PDF stamped");
    Ok(output)
}

/// Number of pages in a PDF byte buffer.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes)
        .map_err(|err| WassermarkError::Pdf(format!("failed to load PDF: {err}")))?;
    Ok(doc.get_pages().len())
}

/// Width and height of a page in PDF user-space units, resolved from the
/// page's MediaBox or inherited from its ancestors. Defaults to US Letter
/// when no MediaBox is present anywhere in the chain.
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<(f32, f32)> {
    match inherited_attr(doc, page_id, b"MediaBox") {
        Some(object) => {
            let resolved = resolve(doc, object);
            let array = resolved.as_array().map_err(|_| {
                WassermarkError::Pdf("MediaBox is not an array".to_string())
            })?;
            if array.len() != 4 {
                return Err(WassermarkError::Pdf(format!(
                    "MediaBox must have 4 entries, got {}",
                    array.len()
                )));
            }
            let n = |i: usize| as_number(&array[i]);
            Ok(((n(2)? - n(0)?).abs(), (n(3)? - n(1)?).abs()))
        }
        None => Ok((612.0, 792.0)),
    }
}

/// Register the raster renderer's embedded font as a TrueType font object.
///
/// Embedding the same TTF the preview rasterizes with means both paths share
/// one set of glyph shapes and advance widths, so exported stamps land where
/// the preview showed them.
fn embed_font(doc: &mut Document) -> ObjectId {
    let data = text::font_data().to_vec();
    let length = data.len() as i64;
    let file_id = doc.add_object(Stream::new(dictionary! { "Length1" => length }, data));

    let metrics = text::metrics_em();
    let ascent = (metrics.ascent * 1000.0).round() as i64;
    let descent = (metrics.descent * 1000.0).round() as i64;
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "DejaVuSans-Bold",
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer(-1000),
            Object::Integer(descent),
            Object::Integer(2000),
            Object::Integer(ascent),
        ],
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => ascent,
        "StemV" => 120,
        "FontFile2" => Object::Reference(file_id),
    });

    let widths: Vec<Object> = (PRINTABLE_FIRST..=PRINTABLE_LAST)
        .map(|code| {
            Object::Integer((text::advance_em(code as u8 as char) * 1000.0).round() as i64)
        })
        .collect();

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => "DejaVuSans-Bold",
        "FirstChar" => PRINTABLE_FIRST,
        "LastChar" => PRINTABLE_LAST,
        "Widths" => widths,
        "FontDescriptor" => Object::Reference(descriptor_id),
        "Encoding" => "WinAnsiEncoding",
    })
}

// -- Content generation -------------------------------------------------------

/// Build the content stream operations for one page, or `None` when the
/// watermark text is empty.
fn page_ops(
    config: &WatermarkConfig,
    width: f32,
    height: f32,
    color: Rgb,
) -> Result<Option<String>> {
    if config.text.is_empty() {
        return Ok(None);
    }

    let size = SurfaceSize::from_dimensions(width, height);
    let placement = geometry::placement(config, size)?;
    let theta = placement.rotation_radians();

    let font_size = config.font_size_px as f32;
    // Width the stamp will actually draw: `Tj` applies no kerning, so the
    // unkerned advances of the characters as escaped.
    let text_width: f32 = config
        .text
        .chars()
        .map(|c| {
            let c = if (' '..='~').contains(&c) { c } else { '?' };
            text::advance_em(c)
        })
        .sum::<f32>()
        * font_size;

    // Glyphs are drawn from the baseline-left corner; shift left by half the
    // width, and down from the glyph block's vertical center to the
    // baseline, so the text is centered on the placement point exactly as on
    // the raster surface.
    let metrics = text::metrics_em();
    let offset_x = -text_width / 2.0;
    let offset_y = -(metrics.ascent + metrics.descent) / 2.0 * font_size;

    // Preview rotation is visually clockwise in the y-down raster frame;
    // in PDF's y-up space the same visual result needs the negated angle.
    let phi = -theta;
    let (sin, cos) = phi.sin_cos();

    let (r, g, b) = color.to_unit();
    let mut ops = String::new();
    writeln!(ops, "q").unwrap();
    writeln!(ops, "/{GS_RESOURCE} gs").unwrap();
    writeln!(ops, "BT").unwrap();
    writeln!(ops, "/{FONT_RESOURCE} {font_size:.2} Tf").unwrap();
    writeln!(ops, "{r:.4} {g:.4} {b:.4} rg").unwrap();

    let escaped = escape_pdf_text(&config.text);
    let mut stamp = |top_down: Point| {
        // Flip into bottom-left-origin user space.
        let px = top_down.x;
        let py = height - top_down.y;
        let tx = px + offset_x * cos - offset_y * sin;
        let ty = py + offset_x * sin + offset_y * cos;
        writeln!(
            ops,
            "{cos:.4} {sin:.4} {nsin:.4} {cos:.4} {tx:.2} {ty:.2} Tm ({escaped}) Tj",
            nsin = -sin,
        )
        .unwrap();
    };

    match placement {
        Placement::Single { point, .. } => stamp(point),
        Placement::Grid {
            points,
            rotation_radians,
        } => {
            for point in points {
                stamp(point.rotate(rotation_radians));
            }
        }
    }

    writeln!(ops, "ET").unwrap();
    writeln!(ops, "Q").unwrap();
    Ok(Some(ops))
}

/// Escape text for a literal PDF string. Characters outside the printable
/// ASCII range degrade to '?', matching the font's replacement-glyph
/// behavior; stamping never fails on unsupported characters.
fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\\' => escaped.push_str("\\\\"),
            ' '..='~' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

// -- Page object surgery ------------------------------------------------------

/// Resolve an object one level of indirection deep.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn as_number(object: &Object) -> Result<f32> {
    match object {
        Object::Integer(i) => Ok(*i as f32),
        Object::Real(r) => Ok(*r as f32),
        other => Err(WassermarkError::Pdf(format!(
            "expected a number, got {other:?}"
        ))),
    }
}

/// Look up a page attribute, walking the /Parent chain for inheritable keys
/// like MediaBox and Resources.
fn inherited_attr<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Build the page's new Resources dictionary: the existing (possibly
/// inherited or shared) resources cloned, with the watermark font and
/// graphics state registered. Setting the merged copy inline on the page
/// keeps other pages' resources untouched.
fn stamped_resources(
    doc: &Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gs_id: ObjectId,
) -> Result<Dictionary> {
    let mut resources = match inherited_attr(doc, page_id, b"Resources") {
        Some(object) => resolve(doc, object)
            .as_dict()
            .ok()
            .cloned()
            .unwrap_or_default(),
        None => Dictionary::new(),
    };

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok().cloned())
        .unwrap_or_default();
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let mut states = resources
        .get(b"ExtGState")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok().cloned())
        .unwrap_or_default();
    states.set(GS_RESOURCE, Object::Reference(gs_id));
    resources.set("ExtGState", Object::Dictionary(states));

    Ok(resources)
}

/// Install the merged resources and append the watermark content stream
/// after the page's existing content.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
    content_id: ObjectId,
) -> Result<()> {
    let existing = doc
        .get_object(page_id)
        .ok()
        .and_then(|object| object.as_dict().ok())
        .and_then(|dict| dict.get(b"Contents").ok())
        .cloned();

    // A direct stream must first be hoisted into its own object so it can
    // join a reference array.
    let new_contents = match existing {
        Some(Object::Array(mut refs)) => {
            refs.push(Object::Reference(content_id));
            Object::Array(refs)
        }
        Some(reference @ Object::Reference(_)) => {
            Object::Array(vec![reference, Object::Reference(content_id)])
        }
        Some(Object::Stream(stream)) => {
            let hoisted = doc.add_object(Object::Stream(stream));
            Object::Array(vec![
                Object::Reference(hoisted),
                Object::Reference(content_id),
            ])
        }
        _ => Object::Reference(content_id),
    };

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|object| object.as_dict_mut())
        .map_err(|err| WassermarkError::Pdf(format!("page {page_id:?} unreadable: {err}")))?;

    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", new_contents);

    debug!(?page_id, "content stream appended");
    Ok(())
}

// -- Test support -------------------------------------------------------------

#[cfg(test)]
pub mod tests_support {
    use super::*;

    /// Build a minimal valid PDF with `pages` blank pages of the given size.
    pub fn minimal_pdf(pages: u32, width: f32, height: f32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width.into()),
                    Object::Real(height.into()),
                ],
                "Contents" => Object::Reference(content_id),
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages as i64),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize minimal PDF");
        bytes
    }
}
