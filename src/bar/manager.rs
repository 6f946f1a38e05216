//! The bar itself: item table, rotator ownership and dirty propagation.

use crate::bar::image::Image;
use crate::bar::item::{BarItem, ItemSnapshot};
use crate::core::{FrameClock, RotatorManager, RotatorSnapshot, ScheduleError, TickOutcome};
use crate::render::Renderer;
use anyhow::Result;
use log::{debug, warn};
use rotabar_types::{ItemConfig, ItemId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// What the render pass must repaint, as reported by [`BarManager::take_dirty`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirtyReport {
    /// Repaint everything, ignoring the per-item list.
    pub whole_bar: bool,
    /// Items whose content changed since the last report, in bar order.
    pub items: Vec<ItemId>,
}

impl DirtyReport {
    pub fn is_clean(&self) -> bool {
        !self.whole_bar && self.items.is_empty()
    }
}

/// Full bar state for diagnostic dumps.
#[derive(Debug, Serialize)]
pub struct BarSnapshot {
    pub items: Vec<ItemSnapshot>,
    pub rotators: Vec<RotatorSnapshot>,
    pub enabled_rotators: usize,
    pub clock_subscribed: bool,
}

/// Owns the item table and the rotator manager, and maps tick outcomes back
/// onto items through their explicit target ids.
pub struct BarManager {
    items: HashMap<ItemId, BarItem>,
    /// Item ids in bar order, the order items were added.
    order: Vec<ItemId>,
    rotators: RotatorManager,
    bar_dirty: bool,
}

impl BarManager {
    pub fn new(clock: Arc<dyn FrameClock>) -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
            rotators: RotatorManager::new(clock),
            bar_dirty: true,
        }
    }

    pub fn rotators(&self) -> &RotatorManager {
        &self.rotators
    }

    /// Build an item from config, including its image and any configured
    /// rotation. A clock failure leaves the item in place unanimated.
    pub fn add_item(&mut self, config: ItemConfig) -> ItemId {
        let mut item = BarItem::from_config(&config);
        let id = item.id();

        if let Some(image_config) = &config.image {
            let mut image = Image::from_config(id, image_config);
            if image_config.rotate_rate != 0.0 {
                if let Err(e) = image.set_rotate_rate(&mut self.rotators, image_config.rotate_rate)
                {
                    warn!("item '{}' will not animate: {e}", item.name);
                }
            }
            if let Some(degrees) = image_config.rotate_degrees {
                match image.set_rotate_degrees(&mut self.rotators, degrees) {
                    Ok(_) => item.mark_dirty(),
                    Err(e) => warn!("item '{}' rotation not applied: {e}", item.name),
                }
            }
            item.image = Some(image);
        }

        debug!("added item '{}' as {id}", item.name);
        self.items.insert(id, item);
        self.order.push(id);
        self.bar_dirty = true;
        id
    }

    /// Remove an item, releasing its rotator before the entry is dropped.
    pub fn remove_item(&mut self, id: ItemId) {
        if let Some(mut item) = self.items.remove(&id) {
            if let Some(image) = &mut item.image {
                image.release_rotator(&mut self.rotators);
            }
            self.order.retain(|entry| *entry != id);
            self.bar_dirty = true;
            debug!("removed item '{}'", item.name);
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&BarItem> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut BarItem> {
        self.items.get_mut(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ItemId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.items.get(id).is_some_and(|item| item.name == name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drive one clock tick through the rotators and fold the outcome into
    /// per-item dirty flags. A changed rotator whose target is gone degrades
    /// to marking the whole bar dirty.
    pub fn handle_tick(&mut self, timestamp: Duration) -> TickOutcome {
        let outcome = self.rotators.on_tick(timestamp);
        for target in &outcome.changed_items {
            match self.items.get_mut(target) {
                Some(item) => {
                    if item.is_shown() {
                        item.mark_dirty();
                    }
                }
                None => {
                    warn!("rotator changed unknown item {target}, repainting whole bar");
                    self.bar_dirty = true;
                }
            }
        }
        outcome
    }

    /// Drain every queued tick event and apply it. Returns the number of
    /// ticks processed.
    pub fn drain_ticks(&mut self) -> usize {
        let rx = self.rotators.tick_events();
        let mut processed = 0;
        while let Ok(event) = rx.try_recv() {
            self.handle_tick(event.timestamp);
            processed += 1;
        }
        processed
    }

    /// One poll cycle across every item, in bar order.
    pub fn poll_all(&mut self, forced: bool) -> Result<usize> {
        let mut fired = 0;
        for id in &self.order {
            if let Some(item) = self.items.get_mut(id) {
                if item.poll(forced) {
                    fired += 1;
                }
            }
        }
        Ok(fired)
    }

    pub fn poll_item(&mut self, id: ItemId, forced: bool) -> Result<bool> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or(ScheduleError::StaleTarget(id))?;
        Ok(item.poll(forced))
    }

    /// Set an item's image rotation rate.
    pub fn set_item_rotate_rate(&mut self, id: ItemId, rate: f64) -> Result<(), ScheduleError> {
        let item = self.items.get_mut(&id).ok_or(ScheduleError::StaleTarget(id))?;
        match &mut item.image {
            Some(image) => image.set_rotate_rate(&mut self.rotators, rate),
            None => Ok(()),
        }
    }

    /// Set an item's image to an explicit angle and mark it dirty so the
    /// frame renders immediately, even when nothing animates.
    pub fn set_item_rotate_degrees(
        &mut self,
        id: ItemId,
        degrees: f64,
    ) -> Result<f64, ScheduleError> {
        let item = self.items.get_mut(&id).ok_or(ScheduleError::StaleTarget(id))?;
        let Some(image) = &mut item.image else {
            return Err(ScheduleError::StaleTarget(id));
        };
        let wrapped = image.set_rotate_degrees(&mut self.rotators, degrees)?;
        item.mark_dirty();
        Ok(wrapped)
    }

    /// Collect and reset the dirty state accumulated since the last call.
    pub fn take_dirty(&mut self) -> DirtyReport {
        let whole_bar = std::mem::take(&mut self.bar_dirty);
        let mut dirty_items = Vec::new();
        for id in &self.order {
            if let Some(item) = self.items.get_mut(id) {
                if item.needs_update() {
                    item.clear_dirty();
                    dirty_items.push(*id);
                }
            }
        }
        DirtyReport {
            whole_bar,
            items: dirty_items,
        }
    }

    /// Resolve the frame for an item, following an image link when the item
    /// has no buffer of its own. The link target's rotation applies.
    fn frame_for(&self, item: &BarItem) -> Option<image::RgbaImage> {
        let image = item.image.as_ref()?;
        if let Some(frame) = image.rendered_frame(&self.rotators) {
            return Some(frame);
        }
        let linked = self.items.get(&image.link?)?;
        linked
            .image
            .as_ref()
            .and_then(|other| other.rendered_frame(&self.rotators))
    }

    /// Install a decoded pixel buffer into an item's image. Image decoding
    /// happens outside the scheduling core; this is where the result lands.
    pub fn set_item_image_buffer(
        &mut self,
        id: ItemId,
        buffer: image::RgbaImage,
    ) -> Result<(), ScheduleError> {
        let item = self.items.get_mut(&id).ok_or(ScheduleError::StaleTarget(id))?;
        let Some(image) = &mut item.image else {
            return Err(ScheduleError::StaleTarget(id));
        };
        image.set_buffer(&mut self.rotators, buffer)?;
        item.mark_dirty();
        Ok(())
    }

    /// Mirror another item's image buffer into this item.
    pub fn set_item_image_link(
        &mut self,
        id: ItemId,
        target: Option<ItemId>,
    ) -> Result<(), ScheduleError> {
        let item = self.items.get_mut(&id).ok_or(ScheduleError::StaleTarget(id))?;
        let Some(image) = &mut item.image else {
            return Err(ScheduleError::StaleTarget(id));
        };
        image.link = target;
        item.mark_dirty();
        Ok(())
    }

    /// Push the current dirty set through a renderer.
    pub fn render_into(&mut self, renderer: &mut dyn Renderer) {
        let report = self.take_dirty();
        if report.is_clean() {
            return;
        }
        if report.whole_bar {
            renderer.invalidate_all();
        }
        let targets: Vec<ItemId> = if report.whole_bar {
            self.order.clone()
        } else {
            report.items
        };
        for id in targets {
            let Some(item) = self.items.get(&id) else {
                continue;
            };
            if !item.is_shown() {
                continue;
            }
            let frame = self.frame_for(item);
            renderer.draw_item(&item.snapshot(), frame.as_ref());
        }
    }

    pub fn snapshot(&self) -> BarSnapshot {
        let items = self
            .order
            .iter()
            .filter_map(|id| self.items.get(id))
            .map(BarItem::snapshot)
            .collect();
        let rotators = self
            .order
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter_map(|item| item.image.as_ref())
            .filter_map(|image| image.rotator())
            .filter_map(|rid| self.rotators.snapshot_of(rid))
            .collect();
        BarSnapshot {
            items,
            rotators,
            enabled_rotators: self.rotators.enabled_count(),
            clock_subscribed: self.rotators.has_subscription(),
        }
    }

    /// Tear down all scheduling before the bar is dropped.
    pub fn shutdown(&mut self) {
        for item in self.items.values_mut() {
            if let Some(image) = &mut item.image {
                image.release_rotator(&mut self.rotators);
            }
        }
        self.rotators.shutdown();
    }
}
