// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry engine — computes watermark draw origins for single and tiled
// placement under arbitrary rotation.
//
// All points are emitted in surface-local, pre-rotation coordinates. The
// renderer applies the single shared rotation angle to the whole drawing
// operation: around the point itself in single mode, around the surface
// origin in grid mode.

use tracing::{debug, instrument};
use wassermark_core::config::{WatermarkConfig, WatermarkMode};
use wassermark_core::error::{Result, WassermarkError};

/// Dimensions of the surface being stamped, in pixels (raster) or points
/// (PDF user space). The geometry is unit-agnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn from_dimensions(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Length of the surface diagonal.
    pub fn diagonal(&self) -> f32 {
        self.width.hypot(self.height)
    }
}

/// A draw origin in surface-local, pre-rotation coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotate about the origin by `radians` (positive is clockwise in the
    /// y-down raster convention).
    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

/// Where and how to stamp the watermark on one surface.
#[derive(Debug, Clone)]
pub enum Placement {
    /// Exactly one point; rotation is applied around the point.
    Single {
        point: Point,
        rotation_radians: f32,
    },
    /// Lazy sequence of tile origins covering the full rotated bounding
    /// area; rotation is applied to the whole frame around the origin.
    Grid {
        points: GridPoints,
        rotation_radians: f32,
    },
}

impl Placement {
    pub fn rotation_radians(&self) -> f32 {
        match self {
            Self::Single {
                rotation_radians, ..
            }
            | Self::Grid {
                rotation_radians, ..
            } => *rotation_radians,
        }
    }
}

/// Compute the placement for one config/surface pair.
///
/// Single mode places the point at `(width * x% / 100, height * y% / 100)`.
/// Grid mode tiles from `-diag` up to (but excluding) `diag * 1.5` on both
/// axes in steps of `gap_px`, where `diag` is the surface diagonal. The grid
/// deliberately overproduces so that no rotation angle can expose an
/// unwatermarked corner; the renderer clips naturally to the surface bounds.
#[instrument(skip(config), fields(mode = ?config.mode))]
pub fn placement(config: &WatermarkConfig, size: SurfaceSize) -> Result<Placement> {
    let rotation_radians = config.rotation_radians();

    match config.mode {
        WatermarkMode::Single => {
            let point = Point::new(
                size.width * config.x_percent / 100.0,
                size.height * config.y_percent / 100.0,
            );
            debug!(x = point.x, y = point.y, "single placement");
            Ok(Placement::Single {
                point,
                rotation_radians,
            })
        }
        WatermarkMode::Grid => {
            let points = GridPoints::new(size.diagonal(), config.gap_px)?;
            debug!(
                per_axis = points.per_axis(),
                total = points.len(),
                "grid placement"
            );
            Ok(Placement::Grid {
                points,
                rotation_radians,
            })
        }
    }
}

/// Lazy Cartesian product of tile origins for grid mode.
///
/// Emits `ceil(2.5 * diag / gap)` positions per axis, x-major, starting at
/// `-diag` on both axes.
#[derive(Debug, Clone)]
pub struct GridPoints {
    diag: f32,
    gap: f32,
    per_axis: usize,
    next: usize,
}

impl GridPoints {
    /// A non-positive (or non-finite) gap would never terminate; reject it
    /// before any point is produced.
    pub fn new(diag: f32, gap: f32) -> Result<Self> {
        if !gap.is_finite() || gap <= 0.0 {
            return Err(WassermarkError::Config(format!(
                "grid gap must be a positive number of pixels, got {gap}"
            )));
        }
        let per_axis = (2.5 * diag / gap).ceil() as usize;
        Ok(Self {
            diag,
            gap,
            per_axis,
            next: 0,
        })
    }

    /// Number of tile origins along each axis.
    pub fn per_axis(&self) -> usize {
        self.per_axis
    }
}

impl Iterator for GridPoints {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.next >= self.per_axis * self.per_axis {
            return None;
        }
        let ix = self.next / self.per_axis;
        let iy = self.next % self.per_axis;
        self.next += 1;
        Some(Point::new(
            -self.diag + ix as f32 * self.gap,
            -self.diag + iy as f32 * self.gap,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.per_axis * self.per_axis - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPoints {}

#[cfg(test)]
mod tests {
    use super::*;
    use wassermark_core::config::WatermarkMode;

    fn config(mode: WatermarkMode) -> WatermarkConfig {
        WatermarkConfig {
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn single_point_is_exact_percentage() {
        let cfg = WatermarkConfig {
            text: "CONFIDENTIAL".into(),
            mode: WatermarkMode::Single,
            x_percent: 50.0,
            y_percent: 50.0,
            rotation_degrees: 0.0,
            ..Default::default()
        };

        let placement = placement(&cfg, SurfaceSize::new(1000, 800)).unwrap();
        match placement {
            Placement::Single { point, .. } => {
                assert_eq!(point.x, 500.0);
                assert_eq!(point.y, 400.0);
            }
            Placement::Grid { .. } => panic!("expected single placement"),
        }
    }

    #[test]
    fn single_point_corners() {
        let mut cfg = config(WatermarkMode::Single);
        cfg.x_percent = 0.0;
        cfg.y_percent = 100.0;

        match placement(&cfg, SurfaceSize::new(640, 480)).unwrap() {
            Placement::Single { point, .. } => {
                assert_eq!(point.x, 0.0);
                assert_eq!(point.y, 480.0);
            }
            Placement::Grid { .. } => panic!("expected single placement"),
        }
    }

    #[test]
    fn grid_count_matches_ceil_formula() {
        // 800x600 has a diagonal of exactly 1000; with gap 200 that is
        // ceil(2500 / 200) = 13 per axis, 169 total.
        let mut cfg = config(WatermarkMode::Grid);
        cfg.gap_px = 200.0;

        match placement(&cfg, SurfaceSize::new(800, 600)).unwrap() {
            Placement::Grid { points, .. } => {
                assert_eq!(points.per_axis(), 13);
                assert_eq!(points.len(), 169);
                assert_eq!(points.count(), 169);
            }
            Placement::Single { .. } => panic!("expected grid placement"),
        }
    }

    #[test]
    fn grid_starts_at_negative_diagonal() {
        let mut cfg = config(WatermarkMode::Grid);
        cfg.gap_px = 200.0;

        match placement(&cfg, SurfaceSize::new(800, 600)).unwrap() {
            Placement::Grid { mut points, .. } => {
                let first = points.next().unwrap();
                assert_eq!(first.x, -1000.0);
                assert_eq!(first.y, -1000.0);
                // Second point advances on the inner (y) axis.
                let second = points.next().unwrap();
                assert_eq!(second.x, -1000.0);
                assert_eq!(second.y, -800.0);
            }
            Placement::Single { .. } => panic!("expected grid placement"),
        }
    }

    #[test]
    fn grid_covers_past_the_far_corner() {
        // The last origin on each axis must reach beyond the surface extent
        // for any rotation in [0, 360) — coverage up to diag * 1.5 from
        // -diag guarantees it.
        let mut cfg = config(WatermarkMode::Grid);
        cfg.gap_px = 175.0;
        let size = SurfaceSize::new(800, 600);

        match placement(&cfg, size).unwrap() {
            Placement::Grid { points, .. } => {
                let max_x = points
                    .clone()
                    .map(|p| p.x)
                    .fold(f32::NEG_INFINITY, f32::max);
                assert!(max_x >= size.diagonal());
                // And every point stays below the 1.5 * diag bound.
                assert!(points.clone().all(|p| p.x < size.diagonal() * 1.5));
                assert!(points.clone().all(|p| p.y >= -size.diagonal()));
            }
            Placement::Single { .. } => panic!("expected grid placement"),
        }
    }

    #[test]
    fn grid_rejects_non_positive_gap() {
        for gap in [0.0, -10.0, f32::NAN, f32::INFINITY] {
            let mut cfg = config(WatermarkMode::Grid);
            cfg.gap_px = gap;
            let result = placement(&cfg, SurfaceSize::new(800, 600));
            assert!(result.is_err(), "gap {gap} accepted");
        }
    }

    #[test]
    fn relative_position_is_size_independent() {
        let mut cfg = config(WatermarkMode::Single);
        cfg.x_percent = 25.0;
        cfg.y_percent = 75.0;

        let small = placement(&cfg, SurfaceSize::new(600, 400)).unwrap();
        let large = placement(&cfg, SurfaceSize::new(3000, 2000)).unwrap();

        let relative = |p: &Placement, size: SurfaceSize| match p {
            Placement::Single { point, .. } => (point.x / size.width, point.y / size.height),
            Placement::Grid { .. } => panic!("expected single placement"),
        };

        assert_eq!(
            relative(&small, SurfaceSize::new(600, 400)),
            relative(&large, SurfaceSize::new(3000, 2000))
        );
    }

    #[test]
    fn point_rotation_about_origin() {
        let p = Point::new(1.0, 0.0).rotate(std::f32::consts::FRAC_PI_2);
        assert!(p.x.abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_angle_is_carried_through() {
        let mut cfg = config(WatermarkMode::Grid);
        cfg.rotation_degrees = -45.0;
        let placement = placement(&cfg, SurfaceSize::new(800, 600)).unwrap();
        assert!((placement.rotation_radians() - (-45.0f32).to_radians()).abs() < 1e-6);
    }
}
