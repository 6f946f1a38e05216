//! Configuration types for bar items.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Horizontal placement of an item on the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Default for Position {
    fn default() -> Self {
        Position::Right
    }
}

/// Configuration of a single bar item as it appears in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub label: String,
    /// Backing script re-run when the item's update throttle fires.
    #[serde(default)]
    pub script: String,
    /// Script run on click events.
    #[serde(default)]
    pub click_script: String,
    /// Fire a refresh every N external ticks; 0 means never unless forced.
    #[serde(default)]
    pub update_frequency: u32,
    #[serde(default = "default_true")]
    pub drawing: bool,
    #[serde(default = "default_true")]
    pub updates: bool,
    #[serde(default)]
    pub lazy: bool,
    #[serde(default)]
    pub y_offset: i32,
    #[serde(default)]
    pub image: Option<ImageConfig>,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Position::default(),
            icon: String::new(),
            label: String::new(),
            script: String::new(),
            click_script: String::new(),
            update_frequency: 0,
            drawing: true,
            updates: true,
            lazy: false,
            y_offset: 0,
            image: None,
        }
    }
}

/// Configuration of an item's image element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default)]
    pub border_width: f64,
    #[serde(default)]
    pub border_color: Option<Color>,
    #[serde(default)]
    pub padding_left: i32,
    #[serde(default)]
    pub padding_right: i32,
    #[serde(default)]
    pub y_offset: i32,
    /// Continuous rotation rate in degrees per second; 0 disables animation.
    #[serde(default)]
    pub rotate_rate: f64,
    /// One-shot rotation angle in degrees, applied at load.
    #[serde(default)]
    pub rotate_degrees: Option<f64>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            path: None,
            scale: default_scale(),
            corner_radius: 0.0,
            border_width: 0.0,
            border_color: None,
            padding_left: 0,
            padding_right: 0,
            y_offset: 0,
            rotate_rate: 0.0,
            rotate_degrees: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}
