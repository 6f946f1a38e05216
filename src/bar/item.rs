//! Bar items and their per-item update throttle.

use crate::bar::image::Image;
use crate::exec::spawn_script;
use anyhow::Result;
use log::{trace, warn};
use rotabar_types::{ItemConfig, ItemId, Position};
use serde::Serialize;

/// Optional live data backing for an item's label, refreshed when the item's
/// throttle fires.
pub trait ItemDataSource: Send + Sync {
    /// Fetch the current value. The returned string becomes the item label.
    fn refresh(&mut self) -> Result<String>;
}

/// One entry on the bar: text, icon, an optional image and the throttle
/// state that decides when its backing script re-runs.
pub struct BarItem {
    id: ItemId,
    pub name: String,
    pub position: Position,
    pub icon: String,
    pub label: String,
    pub script: String,
    pub click_script: String,
    pub drawing: bool,
    pub updates: bool,
    pub lazy: bool,
    pub selected: bool,
    pub y_offset: i32,

    /// Fires every `update_frequency` poll cycles; 0 means never unless
    /// forced.
    pub update_frequency: u32,
    counter: u32,
    needs_update: bool,

    /// Bitmask of bars this item appears on.
    associated_bars: u32,
    /// Bitmask of displays this item appears on.
    associated_displays: u32,

    pub image: Option<Image>,
    source: Option<Box<dyn ItemDataSource>>,
}

/// Point-in-time view of an item for diagnostic dumps.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub position: Position,
    pub icon: String,
    pub label: String,
    pub drawing: bool,
    pub updates: bool,
    pub update_frequency: u32,
    pub counter: u32,
    pub needs_update: bool,
    pub associated_bars: u32,
    pub associated_displays: u32,
}

impl BarItem {
    pub fn from_config(config: &ItemConfig) -> Self {
        Self {
            id: ItemId::new(),
            name: config.name.clone(),
            position: config.position,
            icon: config.icon.clone(),
            label: config.label.clone(),
            script: config.script.clone(),
            click_script: config.click_script.clone(),
            drawing: config.drawing,
            updates: config.updates,
            lazy: config.lazy,
            selected: false,
            y_offset: config.y_offset,
            update_frequency: config.update_frequency,
            counter: 0,
            needs_update: !config.lazy,
            associated_bars: 1,
            associated_displays: 1,
            image: None,
            source: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn set_source(&mut self, source: Box<dyn ItemDataSource>) {
        self.source = Some(source);
    }

    /// Whether the item is visible anywhere.
    pub fn is_shown(&self) -> bool {
        self.drawing && self.associated_bars != 0
    }

    pub fn associate_bar(&mut self, bar_index: u32) {
        if let Some(mask) = 1u32.checked_shl(bar_index) {
            self.associated_bars |= mask;
        }
    }

    pub fn dissociate_bar(&mut self, bar_index: u32) {
        if let Some(mask) = 1u32.checked_shl(bar_index) {
            self.associated_bars &= !mask;
        }
    }

    pub fn reset_bar_association(&mut self) {
        self.associated_bars = 0;
    }

    pub fn associate_display(&mut self, display_index: u32) {
        if let Some(mask) = 1u32.checked_shl(display_index) {
            self.associated_displays |= mask;
        }
    }

    pub fn dissociate_display(&mut self, display_index: u32) {
        if let Some(mask) = 1u32.checked_shl(display_index) {
            self.associated_displays &= !mask;
        }
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn mark_dirty(&mut self) {
        self.needs_update = true;
    }

    pub fn clear_dirty(&mut self) {
        self.needs_update = false;
    }

    /// Throttle decision for one poll cycle. A forced poll always fires and
    /// resets the counter; an unforced one fires every `update_frequency`
    /// cycles and never for frequency 0 or with updates off.
    fn should_fire(&mut self, forced: bool) -> bool {
        if !forced && (!self.updates || self.update_frequency == 0) {
            return false;
        }
        self.counter += 1;
        if forced || self.counter >= self.update_frequency {
            self.counter = 0;
            return true;
        }
        false
    }

    /// One poll cycle for this item. Returns whether it fired.
    pub fn poll(&mut self, forced: bool) -> bool {
        if !self.should_fire(forced) {
            return false;
        }
        trace!("item '{}' firing (forced: {forced})", self.name);

        if !self.script.is_empty() {
            spawn_script(&self.script, &self.script_env());
        }

        // The linked source is only refreshed while the item is actually
        // visible somewhere; a hidden item's script still runs. A script-only
        // fire does not dirty the item, the script's own commands do.
        if self.is_shown() {
            if let Some(source) = &mut self.source {
                match source.refresh() {
                    Ok(value) => {
                        if value != self.label {
                            self.label = value;
                            self.needs_update = true;
                        }
                    }
                    Err(e) => warn!("data source for item '{}' failed: {e}", self.name),
                }
            }
        }

        true
    }

    /// Run the click script, if any, with `BUTTON` added to the environment.
    pub fn click(&mut self, button: u32) {
        if self.click_script.is_empty() {
            return;
        }
        let mut env = self.script_env();
        env.push(("BUTTON".to_string(), button.to_string()));
        spawn_script(&self.click_script, &env);
    }

    /// Environment passed to every spawned script.
    pub fn script_env(&self) -> Vec<(String, String)> {
        vec![
            ("NAME".to_string(), self.name.clone()),
            ("SELECTED".to_string(), self.selected.to_string()),
            ("INFO".to_string(), self.label.clone()),
        ]
    }

    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            icon: self.icon.clone(),
            label: self.label.clone(),
            drawing: self.drawing,
            updates: self.updates,
            update_frequency: self.update_frequency,
            counter: self.counter,
            needs_update: self.needs_update,
            associated_bars: self.associated_bars,
            associated_displays: self.associated_displays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_frequency(frequency: u32) -> BarItem {
        BarItem::from_config(&ItemConfig {
            name: "test".into(),
            update_frequency: frequency,
            ..ItemConfig::default()
        })
    }

    #[test]
    fn test_frequency_three_fires_every_third_poll() {
        let mut item = item_with_frequency(3);
        assert!(!item.poll(false));
        assert!(!item.poll(false));
        assert!(item.poll(false));
        // Counter reset: the cycle starts over.
        assert!(!item.poll(false));
        assert!(!item.poll(false));
        assert!(item.poll(false));
    }

    #[test]
    fn test_frequency_zero_never_fires_unforced() {
        let mut item = item_with_frequency(0);
        for _ in 0..10 {
            assert!(!item.poll(false));
        }
    }

    #[test]
    fn test_forced_always_fires_and_resets_counter() {
        let mut item = item_with_frequency(3);
        assert!(!item.poll(false)); // counter = 1
        assert!(item.poll(true)); // forced, counter reset
        // The unforced cadence restarts from zero.
        assert!(!item.poll(false));
        assert!(!item.poll(false));
        assert!(item.poll(false));
    }

    #[test]
    fn test_forced_fires_with_updates_off() {
        let mut item = item_with_frequency(3);
        item.updates = false;
        assert!(!item.poll(false));
        assert!(item.poll(true));
    }

    #[test]
    fn test_forced_fires_right_after_scheduled_fire() {
        // frequency 3: polls 1 and 2 silent, poll 3 fires, a forced poll
        // right after fires again at counter 1.
        let mut item = item_with_frequency(3);
        assert!(!item.poll(false));
        assert!(!item.poll(false));
        assert!(item.poll(false));
        assert!(item.poll(true));
    }

    #[test]
    fn test_script_only_fire_does_not_dirty() {
        // Nothing the item renders changed, so a script re-run alone must
        // not force a redraw.
        let mut item = item_with_frequency(1);
        item.script = "true".into();
        item.clear_dirty();
        assert!(item.poll(false));
        assert!(!item.needs_update());
    }

    #[test]
    fn test_hidden_item_skips_source_refresh() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        struct Counting(Arc<AtomicU32>);
        impl ItemDataSource for Counting {
            fn refresh(&mut self) -> Result<String> {
                self.0.fetch_add(1, Ordering::Relaxed);
                Ok("value".to_string())
            }
        }

        let calls = Arc::new(AtomicU32::new(0));
        let mut item = item_with_frequency(1);
        item.set_source(Box::new(Counting(calls.clone())));
        item.clear_dirty();

        // Hidden: the throttle still fires but the source is left alone.
        item.reset_bar_association();
        assert!(item.poll(false));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert!(!item.needs_update());

        // Shown again: the refresh happens and dirties the item.
        item.associate_bar(0);
        assert!(item.poll(false));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(item.needs_update());
    }

    #[test]
    fn test_bar_association_mask() {
        let mut item = item_with_frequency(1);
        assert!(item.is_shown());
        item.reset_bar_association();
        assert!(!item.is_shown());
        item.associate_bar(2);
        assert!(item.is_shown());
        item.dissociate_bar(2);
        assert!(!item.is_shown());
    }

    #[test]
    fn test_out_of_range_association_indices_are_ignored() {
        let mut item = item_with_frequency(1);
        item.reset_bar_association();
        item.associate_bar(40);
        item.associate_display(32);
        assert!(!item.is_shown());

        item.associate_bar(31);
        assert!(item.is_shown());
        item.dissociate_bar(40);
        assert!(item.is_shown());
    }

    #[test]
    fn test_data_source_updates_label() {
        struct Fixed(&'static str);
        impl ItemDataSource for Fixed {
            fn refresh(&mut self) -> Result<String> {
                Ok(self.0.to_string())
            }
        }

        let mut item = item_with_frequency(1);
        item.clear_dirty();
        item.set_source(Box::new(Fixed("42%")));
        assert!(item.poll(false));
        assert_eq!(item.label, "42%");
        assert!(item.needs_update());

        // Unchanged value does not re-dirty the item.
        item.clear_dirty();
        assert!(item.poll(false));
        assert!(!item.needs_update());
    }

    #[test]
    fn test_lazy_item_starts_clean() {
        let lazy = BarItem::from_config(&ItemConfig {
            name: "lazy".into(),
            lazy: true,
            ..ItemConfig::default()
        });
        assert!(!lazy.needs_update());

        let eager = item_with_frequency(1);
        assert!(eager.needs_update());
    }
}
