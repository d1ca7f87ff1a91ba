use std::time::Duration;

use tokio::time::Instant;

/// Manual suppression flag.
///
/// While armed, inbound events are swallowed at emission time. The flag keeps
/// only the deadline, so re-arming before expiry simply moves it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Suppression {
    until: Option<Instant>,
}

impl Suppression {
    pub fn arm(&mut self, now: Instant, timeout: Duration) {
        self.until = Some(now + timeout);
    }

    pub fn clear(&mut self) {
        self.until = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        matches!(self.until, Some(until) if now < until)
    }
}
