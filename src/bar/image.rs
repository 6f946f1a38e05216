//! Item images and their composition with a rotator.
//!
//! An image owns at most one rotator, created lazily: an image that never
//! rotates costs the scheduler nothing. Setting a nonzero rate creates and
//! enables the rotator; rate zero parks it (disabled but registered, so a
//! later rate change reuses it); dropping the image unregisters it.

use crate::core::{Rotator, RotatorManager, ScheduleError};
use crate::render::rotate::rotate_buffer;
use log::debug;
use rotabar_types::{Color, ImageConfig, ItemId, RotatorId};
use image::RgbaImage;

pub struct Image {
    owner: ItemId,
    pub scale: f64,
    pub corner_radius: f64,
    pub border_width: f64,
    pub border_color: Option<Color>,
    pub padding_left: i32,
    pub padding_right: i32,
    pub y_offset: i32,
    /// Item this image mirrors its buffer from, if any.
    pub link: Option<ItemId>,

    rotate_rate: f64,
    rotator: Option<RotatorId>,
    buffer: Option<RgbaImage>,
}

impl Image {
    pub fn from_config(owner: ItemId, config: &ImageConfig) -> Self {
        Self {
            owner,
            scale: config.scale,
            corner_radius: config.corner_radius,
            border_width: config.border_width,
            border_color: config.border_color,
            padding_left: config.padding_left,
            padding_right: config.padding_right,
            y_offset: config.y_offset,
            link: None,
            rotate_rate: 0.0,
            rotator: None,
            buffer: None,
        }
    }

    pub fn owner(&self) -> ItemId {
        self.owner
    }

    pub fn rotator(&self) -> Option<RotatorId> {
        self.rotator
    }

    pub fn rotate_rate(&self) -> f64 {
        self.rotate_rate
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    fn ensure_rotator(&mut self, rotators: &mut RotatorManager) -> RotatorId {
        match self.rotator {
            Some(id) if rotators.is_registered(id) => id,
            _ => {
                let id = rotators.register(Rotator::spinning(self.owner, 0.0));
                debug!("image for item {} got rotator {id}", self.owner);
                self.rotator = Some(id);
                id
            }
        }
    }

    /// Set the rotation rate in degrees per second. Nonzero lazily creates
    /// and enables the rotator; zero parks it without releasing it.
    pub fn set_rotate_rate(
        &mut self,
        rotators: &mut RotatorManager,
        rate: f64,
    ) -> Result<(), ScheduleError> {
        self.rotate_rate = rate;
        if rate == 0.0 {
            if let Some(id) = self.rotator {
                rotators.set_rate(id, 0.0)?;
                rotators.disable(id);
            }
            return Ok(());
        }
        let id = self.ensure_rotator(rotators);
        rotators.set_rate(id, rate)?;
        rotators.enable(id)
    }

    /// Set an explicit rotation angle, creating a parked rotator if none
    /// exists yet. Returns the wrapped angle; the caller is responsible for
    /// marking the owning item dirty so the frame shows immediately.
    pub fn set_rotate_degrees(
        &mut self,
        rotators: &mut RotatorManager,
        degrees: f64,
    ) -> Result<f64, ScheduleError> {
        let id = self.ensure_rotator(rotators);
        rotators.set_angle(id, degrees)
    }

    /// Replace the pixel buffer, as after an image (re)load. The existing
    /// rotator is re-armed or parked according to the current rate.
    pub fn set_buffer(
        &mut self,
        rotators: &mut RotatorManager,
        buffer: RgbaImage,
    ) -> Result<(), ScheduleError> {
        self.buffer = Some(buffer);
        if self.rotator.is_some() {
            self.set_rotate_rate(rotators, self.rotate_rate)?;
        }
        Ok(())
    }

    /// Current rotation angle in degrees, read under the rotator's lock.
    pub fn current_angle(&self, rotators: &RotatorManager) -> f64 {
        match self.rotator {
            Some(id) => rotators.rotation_of(id).unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Produce the frame to draw: the source buffer rotated by the current
    /// angle around its center, on a canvas large enough that no corner
    /// clips. The source buffer is never mutated. An unrotated image is
    /// returned as-is.
    pub fn rendered_frame(&self, rotators: &RotatorManager) -> Option<RgbaImage> {
        let buffer = self.buffer.as_ref()?;
        let angle = self.current_angle(rotators);
        if angle.abs() < crate::core::ANGLE_EPSILON {
            return Some(buffer.clone());
        }
        Some(rotate_buffer(buffer, angle))
    }

    /// Release the rotator ahead of dropping the image.
    pub fn release_rotator(&mut self, rotators: &mut RotatorManager) {
        if let Some(id) = self.rotator.take() {
            rotators.unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use image::Rgba;
    use std::sync::Arc;

    fn fixture() -> (Image, RotatorManager) {
        let owner = ItemId::new();
        let image = Image::from_config(owner, &ImageConfig::default());
        let rotators = RotatorManager::new(Arc::new(ManualClock::new()));
        (image, rotators)
    }

    #[test]
    fn test_rotator_is_lazy() {
        let (image, rotators) = fixture();
        assert!(image.rotator().is_none());
        assert!(rotators.is_empty());
    }

    #[test]
    fn test_nonzero_rate_creates_and_enables() {
        let (mut image, mut rotators) = fixture();
        image.set_rotate_rate(&mut rotators, 90.0).unwrap();

        let id = image.rotator().unwrap();
        assert!(rotators.is_enabled(id));
        assert!(rotators.has_subscription());
        assert_eq!(rotators.snapshot_of(id).unwrap().rate, 90.0);
    }

    #[test]
    fn test_zero_rate_parks_but_keeps_rotator() {
        let (mut image, mut rotators) = fixture();
        image.set_rotate_rate(&mut rotators, 90.0).unwrap();
        let id = image.rotator().unwrap();

        image.set_rotate_rate(&mut rotators, 0.0).unwrap();
        assert_eq!(image.rotator(), Some(id)); // same rotator, reused
        assert!(!rotators.is_enabled(id));
        assert!(!rotators.has_subscription());

        // Re-arming reuses the parked rotator.
        image.set_rotate_rate(&mut rotators, 45.0).unwrap();
        assert_eq!(image.rotator(), Some(id));
        assert!(rotators.is_enabled(id));
    }

    #[test]
    fn test_set_degrees_without_rate_stays_parked() {
        let (mut image, mut rotators) = fixture();
        let wrapped = image.set_rotate_degrees(&mut rotators, 450.0).unwrap();
        assert_eq!(wrapped, 90.0);

        let id = image.rotator().unwrap();
        assert!(!rotators.is_enabled(id));
        assert!(!rotators.has_subscription());
        assert_eq!(image.current_angle(&rotators), 90.0);
    }

    #[test]
    fn test_release_unregisters() {
        let (mut image, mut rotators) = fixture();
        image.set_rotate_rate(&mut rotators, 90.0).unwrap();
        image.release_rotator(&mut rotators);
        assert!(image.rotator().is_none());
        assert!(rotators.is_empty());
        assert!(!rotators.has_subscription());
    }

    #[test]
    fn test_reload_rearms_existing_rotator() {
        let (mut image, mut rotators) = fixture();
        image.set_rotate_rate(&mut rotators, 90.0).unwrap();
        let id = image.rotator().unwrap();
        rotators.disable(id);

        image
            .set_buffer(&mut rotators, RgbaImage::new(4, 4))
            .unwrap();
        assert!(rotators.is_enabled(id));

        // With rate parked, a reload leaves the rotator parked.
        image.set_rotate_rate(&mut rotators, 0.0).unwrap();
        image
            .set_buffer(&mut rotators, RgbaImage::new(4, 4))
            .unwrap();
        assert!(!rotators.is_enabled(id));
    }

    #[test]
    fn test_rendered_frame_rotates_without_touching_source() {
        let (mut image, mut rotators) = fixture();
        let mut src = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 255, 255]));
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.set_buffer(&mut rotators, src).unwrap();

        image.set_rotate_degrees(&mut rotators, 180.0).unwrap();
        let frame = image.rendered_frame(&rotators).unwrap();
        assert_eq!(frame.dimensions(), (5, 5));
        assert_eq!(frame.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));

        // The stored buffer is unchanged.
        image.set_rotate_degrees(&mut rotators, 0.0).unwrap();
        let unrotated = image.rendered_frame(&rotators).unwrap();
        assert_eq!(unrotated.dimensions(), (3, 3));
        assert_eq!(unrotated.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }
}
