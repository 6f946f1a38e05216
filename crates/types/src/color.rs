//! Foundational color type used throughout rotabar.
//!
//! Bar and item configuration specifies colors as `0xAARRGGBB` hex values,
//! the conventional encoding for status-bar config files.

use serde::{Deserialize, Serialize};

/// RGBA color with alpha channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Create from a packed `0xAARRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self {
            a: ((hex >> 24) & 0xff) as f64 / 255.0,
            r: ((hex >> 16) & 0xff) as f64 / 255.0,
            g: ((hex >> 8) & 0xff) as f64 / 255.0,
            b: (hex & 0xff) as f64 / 255.0,
        }
    }

    /// Convert back to a packed `0xAARRGGBB` value.
    pub fn to_hex(&self) -> u32 {
        let a = (self.a * 255.0).round() as u32;
        let r = (self.r * 255.0).round() as u32;
        let g = (self.g * 255.0).round() as u32;
        let b = (self.b * 255.0).round() as u32;
        (a << 24) | (r << 16) | (g << 8) | b
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    pub fn to_rgba8(&self) -> (u8, u8, u8, u8) {
        (
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        // Opaque white
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}
