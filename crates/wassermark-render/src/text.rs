// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyph rasterizer — renders the watermark text once into a transparent RGBA
// sprite (color, opacity, and rotation baked in) that the surface renderer
// composites at every placement point.

use std::sync::OnceLock;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use tracing::debug;
use wassermark_core::config::Rgb;

/// Embedded fallback font (DejaVu Sans Bold, free license). Characters the
/// font does not cover fall back to its replacement glyph; rendering never
/// fails on unsupported input.
const EMBEDDED_FONT: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

static FONT: OnceLock<FontRef<'static>> = OnceLock::new();

fn font() -> &'static FontRef<'static> {
    FONT.get_or_init(|| {
        FontRef::try_from_slice(EMBEDDED_FONT).expect("embedded font is a valid TTF")
    })
}

/// Raw bytes of the embedded TTF, for callers that embed the font into a
/// document.
pub fn font_data() -> &'static [u8] {
    EMBEDDED_FONT
}

/// Vertical metrics of the embedded font in em units; multiply by the font
/// size to get pixels or PDF text-space units. `descent` is negative.
#[derive(Debug, Clone, Copy)]
pub struct FontMetricsEm {
    pub ascent: f32,
    pub descent: f32,
}

pub fn metrics_em() -> FontMetricsEm {
    let f = font();
    let units = f.units_per_em().unwrap_or_else(|| f.height_unscaled());
    FontMetricsEm {
        ascent: f.ascent_unscaled() / units,
        descent: f.descent_unscaled() / units,
    }
}

/// Horizontal advance of `c` in em units, without kerning.
pub fn advance_em(c: char) -> f32 {
    let f = font();
    let units = f.units_per_em().unwrap_or_else(|| f.height_unscaled());
    f.h_advance_unscaled(f.glyph_id(c)) / units
}

/// Scale that renders the em square at `font_size_px` pixels. A bare
/// `PxScale` sizes the ascent-to-descent span instead, which for this font
/// is taller than the em square; normalizing keeps raster output consistent
/// with canvas-style px sizing and the PDF `Tf` operand.
fn em_px_scale(font_size_px: f32) -> PxScale {
    let f = font();
    let units = f.units_per_em().unwrap_or_else(|| f.height_unscaled());
    PxScale::from(font_size_px * f.height_unscaled() / units)
}

/// Measure the rendered width and height of `text` at `font_size_px`,
/// including kerning. Returns pixel dimensions with a small padding.
pub fn measure_text(text: &str, font_size_px: f32) -> (u32, u32) {
    let scaled = font().as_scaled(em_px_scale(font_size_px));

    let mut width = 0.0f32;
    let mut prev = None;
    for c in text.chars() {
        let glyph = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, glyph);
        }
        width += scaled.h_advance(glyph);
        prev = Some(glyph);
    }

    let padding = 2;
    (
        width.ceil() as u32 + padding,
        scaled.height().ceil() as u32 + padding,
    )
}

/// Rasterize `text` into a transparent RGBA sprite.
///
/// Alpha is glyph coverage scaled by `opacity`; the sprite is then rotated by
/// `rotation_radians` (clockwise, y-down) with the canvas expanded to hold
/// the rotated bounds. Returns `None` when there is nothing to draw — empty
/// text is a valid no-op config, not an error.
pub fn render_sprite(
    text: &str,
    font_size_px: u32,
    color: Rgb,
    opacity: f32,
    rotation_radians: f32,
) -> Option<RgbaImage> {
    if text.is_empty() {
        return None;
    }

    let px = font_size_px as f32;
    let (width, height) = measure_text(text, px);
    if width == 0 || height == 0 {
        return None;
    }

    let scale = em_px_scale(px);
    let scaled = font().as_scaled(scale);
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;

    let mut sprite = RgbaImage::new(width, height);
    let baseline = scaled.ascent();
    let mut cursor = 0.0f32;
    let mut prev = None;

    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor += scaled.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
        if let Some(outlined) = font().outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = gx as i32 + bounds.min.x as i32;
                let y = gy as i32 + bounds.min.y as i32;
                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    let top = Rgba([
                        color.r,
                        color.g,
                        color.b,
                        (coverage * alpha as f32) as u8,
                    ]);
                    let blended = blend(*sprite.get_pixel(x as u32, y as u32), top);
                    sprite.put_pixel(x as u32, y as u32, blended);
                }
            });
        }

        cursor += scaled.h_advance(glyph_id);
        prev = Some(glyph_id);
    }

    if rotation_radians.abs() > f32::EPSILON {
        sprite = rotate_sprite(&sprite, rotation_radians);
    }

    debug!(
        width = sprite.width(),
        height = sprite.height(),
        "sprite rendered"
    );
    Some(sprite)
}

/// Alpha-composite `top` over `bottom`.
fn blend(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let ta = top[3] as f32 / 255.0;
    let ba = bottom[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, b: u8| {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        (((t * ta + b * ba * (1.0 - ta)) / out_a) * 255.0) as u8
    };

    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_a * 255.0) as u8,
    ])
}

/// Rotate a sprite about its center, expanding the canvas to the rotated
/// bounding box. Samples with bilinear interpolation.
fn rotate_sprite(sprite: &RgbaImage, radians: f32) -> RgbaImage {
    let (sin, cos) = radians.sin_cos();
    let src_w = sprite.width() as f32;
    let src_h = sprite.height() as f32;

    let dst_w = (src_w * cos.abs() + src_h * sin.abs()).ceil().max(1.0) as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs()).ceil().max(1.0) as u32;

    let cx = src_w / 2.0;
    let cy = src_h / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    // Inverse-map each destination pixel back into the source.
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 - dst_cx;
            let ry = dy as f32 - dst_cy;
            let sx = rx * cos + ry * sin + cx;
            let sy = -rx * sin + ry * cos + cy;

            if sx >= 0.0 && sx < src_w && sy >= 0.0 && sy < src_h {
                let x0 = sx.floor() as u32;
                let y0 = sy.floor() as u32;
                // Clamp the sampling neighbor at the source edge so the last
                // row and column still contribute.
                let x1 = (x0 + 1).min(sprite.width() - 1);
                let y1 = (y0 + 1).min(sprite.height() - 1);
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let p00 = sprite.get_pixel(x0, y0);
                let p10 = sprite.get_pixel(x1, y0);
                let p01 = sprite.get_pixel(x0, y1);
                let p11 = sprite.get_pixel(x1, y1);

                let lerp = |c: usize| {
                    let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                        + p10[c] as f32 * fx * (1.0 - fy)
                        + p01[c] as f32 * (1.0 - fx) * fy
                        + p11[c] as f32 * fx * fy;
                    v.clamp(0.0, 255.0) as u8
                };

                rotated.put_pixel(dx, dy, Rgba([lerp(0), lerp(1), lerp(2), lerp(3)]));
            }
        }
    }

    rotated
}
