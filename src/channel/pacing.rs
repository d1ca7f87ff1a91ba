use std::time::Duration;

use tokio::time::Instant;

/// Outbound transmission pacer.
///
/// Slots are reserved while the channel state is locked, so concurrent
/// senders always get distinct slots at least `min_interval` apart.
#[derive(Debug, Clone)]
pub struct Pacer {
    min_interval: Duration,
    last_slot: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_slot: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reserve the next transmission slot; returns how long the caller must
    /// wait before transmitting.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }

        let slot = match self.last_slot {
            Some(last) => (last + self.min_interval).max(now),
            None => now,
        };
        self.last_slot = Some(slot);
        slot.saturating_duration_since(now)
    }
}
