//! Bar items, their images and the manager that owns them.

pub mod image;
pub mod item;
pub mod manager;

pub use image::Image;
pub use item::{BarItem, ItemDataSource, ItemSnapshot};
pub use manager::{BarManager, BarSnapshot, DirtyReport};
