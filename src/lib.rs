//! rotabar: an animated status bar with per-item update scheduling
//!
//! This library provides the core functionality for rotabar, including:
//! - The shared frame clock and the rotator registry it drives
//! - Bar items with throttled script refresh and dirty propagation
//! - Image rotation rendering
//! - Configuration management

pub mod bar;
pub mod config;
pub mod core;
pub mod exec;
pub mod render;

// Re-export commonly used types
pub use bar::{BarItem, BarManager, DirtyReport};
pub use config::{AppConfig, BarConfig};
pub use core::{FrameClock, RotatorManager, ScheduleError};
