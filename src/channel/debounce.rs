//! Leading-edge duplicate suppression.
//!
//! A [`DebounceWindow`] exists per distinct timeout among a channel's
//! consumers. It holds one [`Debouncer`] per recently seen [`Fingerprint`].
//! The first occurrence of a fingerprint is emitted, repeats inside the
//! timeout only push the deadline back.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::event::SignalEvent;
use super::suppression::Suppression;

/// Identity of an inbound event for deduplication.
///
/// Payload and command fingerprints live in separate namespaces so that a
/// command id can never collide with the decimal rendering of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    Payload(String),
    Command(String),
}

impl Fingerprint {
    /// Concatenated decimal rendering of each symbol, no separator
    pub fn of_payload(payload: &[u8]) -> Self {
        Self::Payload(payload.iter().map(|symbol| symbol.to_string()).collect())
    }

    pub fn of_command(id: &str) -> Self {
        Self::Command(id.to_owned())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload(digits) => write!(f, "payload:{digits}"),
            Self::Command(id) => write!(f, "cmd:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncerState {
    /// Counting down towards its deadline
    Active,
    /// Frozen with the remaining time kept aside
    Paused,
    /// Deadline passed; the next occurrence is emitted again
    Finished,
}

/// Resettable, pausable one-shot timer state.
///
/// The timer itself is a spawned task owned by the channel. Each re-arm bumps
/// the generation so that a task scheduled for an older deadline can tell it
/// is stale.
#[derive(Debug, Clone)]
pub struct Debouncer {
    timeout: Duration,
    state: DebouncerState,
    deadline: Instant,
    remaining: Duration,
    generation: u64,
}

impl Debouncer {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            state: DebouncerState::Active,
            deadline: now + timeout,
            remaining: timeout,
            generation: 0,
        }
    }

    /// A timer that has already run out
    fn expired(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            state: DebouncerState::Finished,
            deadline: now,
            remaining: Duration::ZERO,
            generation: 0,
        }
    }

    pub fn state(&self) -> DebouncerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deadline of an active timer
    pub fn deadline(&self) -> Option<Instant> {
        (self.state == DebouncerState::Active).then_some(self.deadline)
    }

    /// Restart the full timeout from `now`
    pub fn reset(&mut self, now: Instant) -> Instant {
        self.state = DebouncerState::Active;
        self.deadline = now + self.timeout;
        self.remaining = self.timeout;
        self.generation += 1;
        self.deadline
    }

    /// Freeze an active timer, keeping what is left of it
    pub fn pause(&mut self, now: Instant) {
        if self.state == DebouncerState::Active {
            self.remaining = self.deadline.saturating_duration_since(now);
            self.state = DebouncerState::Paused;
        }
    }

    /// A repeat while paused refills the frozen time without waking the timer
    fn extend_paused(&mut self) {
        if self.state == DebouncerState::Paused {
            self.remaining = self.timeout;
        }
    }

    /// Continue a paused timer with its remaining time
    pub fn resume(&mut self, now: Instant) -> Option<Instant> {
        if self.state != DebouncerState::Paused {
            return None;
        }
        self.state = DebouncerState::Active;
        self.deadline = now + self.remaining;
        self.generation += 1;
        Some(self.deadline)
    }

    /// Observe the timer at `now`, finishing it when the deadline passed
    pub fn poll(&mut self, now: Instant) -> DebouncerState {
        if self.state == DebouncerState::Active && now >= self.deadline {
            self.state = DebouncerState::Finished;
        }
        self.state
    }
}

/// Expiry that the owner has to schedule after [`DebounceWindow::admit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arm {
    pub fingerprint: Fingerprint,
    pub generation: u64,
    pub deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub emit: bool,
    pub arm: Option<Arm>,
}

#[derive(Debug)]
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) sender: mpsc::UnboundedSender<SignalEvent>,
    pub(crate) suppression: Suppression,
}

/// All consumers sharing one debounce timeout on a channel
#[derive(Debug)]
pub struct DebounceWindow {
    timeout: Duration,
    entries: HashMap<Fingerprint, Debouncer>,
    subscribers: Vec<Subscriber>,
}

impl DebounceWindow {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            entries: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of consumers attached to this window
    pub fn refcount(&self) -> usize {
        self.subscribers.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn debouncer(&self, fingerprint: &Fingerprint) -> Option<&Debouncer> {
        self.entries.get(fingerprint)
    }

    /// Decide whether an inbound occurrence is emitted
    ///
    /// | entry    | action                       | emit |
    /// |----------|------------------------------|------|
    /// | none     | create, pause, emit, reset   | yes  |
    /// | finished | reset, pause, emit, reset    | yes  |
    /// | paused   | extend, stay paused          | no   |
    /// | active   | reset                        | no   |
    ///
    /// A zero timeout lets every occurrence through without tracking it.
    pub fn admit(&mut self, fingerprint: Fingerprint, now: Instant) -> Verdict {
        if self.timeout.is_zero() {
            return Verdict {
                emit: true,
                arm: None,
            };
        }

        let timeout = self.timeout;
        let debouncer = self
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(|| Debouncer::expired(timeout, now));

        let emit = match debouncer.poll(now) {
            DebouncerState::Finished => true,
            DebouncerState::Paused => {
                debouncer.extend_paused();
                return Verdict {
                    emit: false,
                    arm: None,
                };
            }
            DebouncerState::Active => false,
        };

        let deadline = debouncer.reset(now);
        Verdict {
            emit,
            arm: Some(Arm {
                fingerprint,
                generation: debouncer.generation(),
                deadline,
            }),
        }
    }

    /// Timer task callback; drops the entry when the armed deadline still holds
    pub fn expire(&mut self, arm: &Arm, now: Instant) -> bool {
        let finished = match self.entries.get_mut(&arm.fingerprint) {
            Some(debouncer) if debouncer.generation() == arm.generation => {
                debouncer.poll(now) == DebouncerState::Finished
            }
            _ => false,
        };
        if finished {
            self.entries.remove(&arm.fingerprint);
        }
        finished
    }

    /// Drop every finished entry, returning how many went away
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, debouncer| debouncer.poll(now) != DebouncerState::Finished);
        before - self.entries.len()
    }

    pub fn pause_all(&mut self, now: Instant) {
        for debouncer in self.entries.values_mut() {
            debouncer.pause(now);
        }
    }

    /// Resume every paused entry; the caller schedules the returned arms
    pub fn resume_all(&mut self, now: Instant) -> Vec<Arm> {
        self.entries
            .iter_mut()
            .filter_map(|(fingerprint, debouncer)| {
                debouncer.resume(now).map(|deadline| Arm {
                    fingerprint: fingerprint.clone(),
                    generation: debouncer.generation(),
                    deadline,
                })
            })
            .collect()
    }

    pub(crate) fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Returns true when the window has no consumers left
    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        self.subscribers.retain(|subscriber| subscriber.id != id);
        self.subscribers.is_empty()
    }

    pub(crate) fn subscriber_mut(&mut self, id: u64) -> Option<&mut Subscriber> {
        self.subscribers
            .iter_mut()
            .find(|subscriber| subscriber.id == id)
    }

    /// Hand an event to every consumer of the window.
    ///
    /// Inbound events are dropped for consumers under manual suppression,
    /// either channel-wide (`channel_muted`) or their own.
    pub(crate) fn publish(&self, event: &SignalEvent, now: Instant, channel_muted: bool) -> usize {
        let mut delivered = 0;
        for subscriber in &self.subscribers {
            if event.is_inbound() && (channel_muted || subscriber.suppression.is_active(now)) {
                continue;
            }
            if subscriber.sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}
