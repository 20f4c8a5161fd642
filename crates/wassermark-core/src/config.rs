// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark configuration.
//
// One immutable `WatermarkConfig` snapshot is passed into every render and
// export call. The preview and the exported artifacts therefore always agree
// on what they are drawing; a batch run freezes its snapshot at run start and
// later edits never affect an in-flight run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WassermarkError};

/// Placement mode for the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkMode {
    /// One watermark instance at a percentage-based position.
    Single,
    /// Watermark tiled at fixed spacing across the whole surface,
    /// rotation-aware.
    Grid,
}

/// Immutable value describing one watermark style.
///
/// `x_percent`/`y_percent` only apply in [`WatermarkMode::Single`] and
/// `gap_px` only in [`WatermarkMode::Grid`], but all fields are validated
/// regardless of the active mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Text to stamp. Empty text renders nothing (not an error).
    pub text: String,
    /// Font size in pixels, relative to the surface being drawn on.
    pub font_size_px: u32,
    /// Opacity in [0, 1].
    pub opacity: f32,
    /// Rotation in degrees, any range; normalized to radians before use.
    pub rotation_degrees: f32,
    /// Fill color as a 6-hex-digit RGB string, leading '#' optional.
    pub color_hex: String,
    pub mode: WatermarkMode,
    /// Single mode: horizontal position as a percentage of surface width.
    pub x_percent: f32,
    /// Single mode: vertical position as a percentage of surface height,
    /// measured from the top.
    pub y_percent: f32,
    /// Grid mode: spacing between tile origins along both axes, in pixels,
    /// measured before rotation.
    pub gap_px: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".to_string(),
            font_size_px: 48,
            opacity: 0.3,
            rotation_degrees: -45.0,
            color_hex: "#ff0000".to_string(),
            mode: WatermarkMode::Grid,
            x_percent: 50.0,
            y_percent: 50.0,
            gap_px: 150.0,
        }
    }
}

impl WatermarkConfig {
    /// Validate every field, active mode or not.
    ///
    /// Returns the first violation as [`WassermarkError::Config`]. Values are
    /// never clamped into range.
    pub fn validate(&self) -> Result<()> {
        if self.font_size_px == 0 {
            return Err(WassermarkError::Config(
                "font size must be a positive number of pixels".to_string(),
            ));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(WassermarkError::Config(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(WassermarkError::Config(
                "rotation must be a finite number of degrees".to_string(),
            ));
        }
        parse_hex_color(&self.color_hex)?;
        for (label, value) in [("x", self.x_percent), ("y", self.y_percent)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(WassermarkError::Config(format!(
                    "{label} position must be a percentage in [0, 100], got {value}"
                )));
            }
        }
        if !self.gap_px.is_finite() || self.gap_px <= 0.0 {
            return Err(WassermarkError::Config(format!(
                "grid gap must be a positive number of pixels, got {}",
                self.gap_px
            )));
        }
        Ok(())
    }

    /// Rotation normalized to radians.
    pub fn rotation_radians(&self) -> f32 {
        self.rotation_degrees.to_radians()
    }

    /// Parsed fill color.
    pub fn color(&self) -> Result<Rgb> {
        parse_hex_color(&self.color_hex)
    }
}

/// Watermark fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to [0, 1], the range PDF `rg` operators expect.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

/// Parse a 6-hex-digit RGB string. A leading '#' is accepted and stripped.
pub fn parse_hex_color(hex: &str) -> Result<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WassermarkError::Config(format!(
            "color must be a 6-hex-digit RGB string, got {hex:?}"
        )));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|e| {
            WassermarkError::Config(format!("invalid hex digit in {hex:?}: {e}"))
        })
    };

    Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
