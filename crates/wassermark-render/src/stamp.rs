// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Surface renderer — stamps the watermark onto a raster surface at every
// geometry point. Used both for the live preview and for full-resolution
// image export; the same config on differently sized surfaces produces the
// same relative placement.

use image::{RgbaImage, imageops};
use tracing::{debug, instrument};
use wassermark_core::config::WatermarkConfig;
use wassermark_core::error::Result;

use crate::geometry::{self, Placement, Point, SurfaceSize};
use crate::text;

/// Stamp `config`'s watermark onto `surface` in place.
///
/// The config is validated first and never retained after the call. Empty
/// text draws nothing and succeeds. Tile origins that land outside the
/// surface clip naturally during compositing.
#[instrument(skip_all, fields(width = surface.width(), height = surface.height()))]
pub fn stamp_image(surface: &mut RgbaImage, config: &WatermarkConfig) -> Result<()> {
    config.validate()?;

    let size = SurfaceSize::new(surface.width(), surface.height());
    let placement = geometry::placement(config, size)?;

    let Some(sprite) = text::render_sprite(
        &config.text,
        config.font_size_px,
        config.color()?,
        config.opacity,
        placement.rotation_radians(),
    ) else {
        debug!("empty watermark text, nothing to draw");
        return Ok(());
    };

    let mut stamped = 0usize;
    match placement {
        Placement::Single { point, .. } => {
            composite_centered(surface, &sprite, point);
            stamped = 1;
        }
        Placement::Grid {
            points,
            rotation_radians,
        } => {
            // Grid points are emitted in the pre-rotation frame; the shared
            // rotation maps them onto the surface.
            for point in points {
                composite_centered(surface, &sprite, point.rotate(rotation_radians));
                stamped += 1;
            }
        }
    }

    debug!(stamped, "surface stamped");
    Ok(())
}

/// Alpha-composite the sprite centered on `point`. Positions partially or
/// fully outside the surface are clipped by `overlay`.
fn composite_centered(surface: &mut RgbaImage, sprite: &RgbaImage, point: Point) {
    let x = (point.x - sprite.width() as f32 / 2.0).round() as i64;
    let y = (point.y - sprite.height() as f32 / 2.0).round() as i64;
    imageops::overlay(surface, sprite, x, y);
}
