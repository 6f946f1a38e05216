//! rotabar-types: Shared data types for the rotabar status bar.
//!
//! This crate contains pure data types (ids, colors, item configuration)
//! shared across the rotabar crates. These types have no
//! scheduling or rendering dependencies, making them suitable as a
//! foundation layer.

pub mod color;
pub mod id;
pub mod item;

// Re-export commonly used types at the crate root for convenience
pub use color::Color;
pub use id::{ItemId, RotatorId};
pub use item::{ImageConfig, ItemConfig, Position};
