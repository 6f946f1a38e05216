//! Slow-path polling scheduler for script-backed items.
//!
//! The fast path (rotators) runs off the frame clock; everything else is
//! polled here on a coarse interval. Each poll cycle offers every item one
//! chance to fire, and the item's own throttle counter decides whether it
//! actually runs its script this cycle.

use crate::bar::BarManager;
use anyhow::Result;
use log::{error, trace};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Drives periodic polling of the bar's items.
pub struct UpdateScheduler {
    bar: Arc<RwLock<BarManager>>,
}

impl UpdateScheduler {
    pub fn new(bar: Arc<RwLock<BarManager>>) -> Self {
        Self { bar }
    }

    /// Run the polling loop indefinitely, offering every item an update
    /// chance once per `base_interval`.
    pub async fn run(&self, base_interval: Duration) {
        let mut interval = tokio::time::interval(base_interval);
        // A missed deadline (system sleep, heavy load) should not replay a
        // burst of catch-up polls.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let start = Instant::now();
            if let Err(e) = self.poll_once(false).await {
                error!("error polling items: {e}");
            }
            trace!("poll cycle took {:?}", start.elapsed());
        }
    }

    /// One poll cycle. `forced` bypasses every item's throttle.
    pub async fn poll_once(&self, forced: bool) -> Result<usize> {
        let mut bar = self.bar.write().await;
        let fired = bar.poll_all(forced)?;
        if fired > 0 {
            trace!("poll cycle fired {fired} item(s)");
        }
        Ok(fired)
    }

    /// Fire every item immediately regardless of throttling, as after a
    /// config reload or an explicit refresh request.
    pub async fn force_all(&self) -> Result<usize> {
        self.poll_once(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use rotabar_types::ItemConfig;

    fn bar_with_items(configs: Vec<ItemConfig>) -> Arc<RwLock<BarManager>> {
        let clock = Arc::new(ManualClock::new());
        let mut bar = BarManager::new(clock);
        for config in configs {
            bar.add_item(config);
        }
        Arc::new(RwLock::new(bar))
    }

    fn item_with_frequency(name: &str, frequency: u32) -> ItemConfig {
        ItemConfig {
            name: name.into(),
            update_frequency: frequency,
            ..ItemConfig::default()
        }
    }

    #[tokio::test]
    async fn test_poll_respects_item_throttle() {
        let bar = bar_with_items(vec![item_with_frequency("cpu", 3)]);
        let scheduler = UpdateScheduler::new(bar);

        // frequency 3: fires on the 3rd, 6th, ... poll.
        assert_eq!(scheduler.poll_once(false).await.unwrap(), 0);
        assert_eq!(scheduler.poll_once(false).await.unwrap(), 0);
        assert_eq!(scheduler.poll_once(false).await.unwrap(), 1);
        assert_eq!(scheduler.poll_once(false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_force_all_bypasses_throttle() {
        let bar = bar_with_items(vec![
            item_with_frequency("cpu", 100),
            item_with_frequency("mem", 0),
        ]);
        let scheduler = UpdateScheduler::new(bar);

        assert_eq!(scheduler.poll_once(false).await.unwrap(), 0);
        // Forced fires both, including the frequency-0 item.
        assert_eq!(scheduler.force_all().await.unwrap(), 2);
    }
}
