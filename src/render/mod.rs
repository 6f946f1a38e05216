//! Rendering seam between the scheduling core and whatever actually
//! composites the bar window. The daemon itself only prepares frames; a
//! [`Renderer`] implementation consumes them.

pub mod rotate;

use crate::bar::ItemSnapshot;
use image::RgbaImage;

pub use rotate::{canvas_side, rotate_buffer};

/// Consumer of prepared item frames. Pixel compositing lives behind this
/// trait so the scheduling core never touches a window system.
pub trait Renderer {
    /// Draw one item. `frame` is the item's rotated image buffer, when it
    /// has one.
    fn draw_item(&mut self, item: &ItemSnapshot, frame: Option<&RgbaImage>);

    /// The whole bar background changed and every item should be redrawn.
    fn invalidate_all(&mut self) {}
}
