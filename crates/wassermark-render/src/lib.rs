// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wassermark-render — Watermark geometry and raster rendering.
//
// Provides the geometry engine (single-point and rotation-aware tiled
// placement), a glyph rasterizer with an embedded font, and the surface
// renderer that stamps watermarks onto in-memory RGBA surfaces.

pub mod geometry;
pub mod stamp;
pub mod text;

pub use geometry::{GridPoints, Placement, Point, SurfaceSize, placement};
pub use stamp::stamp_image;
pub use text::{measure_text, render_sprite};
