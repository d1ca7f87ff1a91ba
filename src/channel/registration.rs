//! Hardware registration coordinator.
//!
//! Keeps the registrant set of a channel and serializes the hardware
//! register/unregister calls it implies. This type never calls the hardware
//! itself: every mutation returns the [`HardwareOp`] the owner must start, and
//! completions are fed back through [`Registration::register_completed`] and
//! [`Registration::unregister_completed`].
//!
//! ```text
//!            register (set 0→1)             ok, set non-empty
//!   Idle ───────────────────────► Registering ──────────────► Registered
//!    ▲  ◄────────── failure ────────┘    │ ok, set empty            │
//!    │                                   ▼                          │ set N→0
//!    └──────── done, set empty ─── Unregistering ◄──────────────────┘
//!                  (set non-empty: start register again)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::mem;

use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::ChannelError;

/// Identity of one registration holder.
///
/// Consumers hold a stable key for as long as they listen; every send uses a
/// fresh transient key that is released right after the transmission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrantKey(String);

impl RegistrantKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Stable, process-unique key for a long-lived consumer
    pub fn consumer(name: &str) -> Self {
        Self(format!("{}#{}", name, Uuid::new_v4().simple()))
    }

    /// Single-use key for one send
    pub fn transient() -> Self {
        Self(format!("tx#{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistrantKey {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Registering,
    Registered,
    Unregistering,
}

/// Hardware call the owner has to start after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareOp {
    Register,
    Unregister,
}

pub type RegisterOutcome = Result<(), ChannelError>;

/// How a register call resolves
#[derive(Debug)]
pub enum Ticket {
    /// Hardware already registered
    Ready,
    /// Resolves when the in-flight (or next) hardware register completes
    Pending(oneshot::Receiver<RegisterOutcome>),
}

#[derive(Debug)]
pub struct Registration {
    registrants: HashSet<RegistrantKey>,
    phase: Phase,
    waiters: Vec<(RegistrantKey, oneshot::Sender<RegisterOutcome>)>,
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl Registration {
    pub fn new() -> Self {
        Self {
            registrants: HashSet::new(),
            phase: Phase::Idle,
            waiters: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registrant_count(&self) -> usize {
        self.registrants.len()
    }

    pub fn contains(&self, key: &RegistrantKey) -> bool {
        self.registrants.contains(key)
    }

    pub fn register(&mut self, key: RegistrantKey) -> (Ticket, Option<HardwareOp>) {
        self.registrants.insert(key.clone());

        match self.phase {
            Phase::Registered => (Ticket::Ready, None),
            Phase::Registering | Phase::Unregistering => (self.wait(key), None),
            Phase::Idle => {
                self.phase = Phase::Registering;
                (self.wait(key), Some(HardwareOp::Register))
            }
        }
    }

    /// Drop a key; unknown keys are ignored.
    ///
    /// A register call of `key` still waiting on the hardware resolves with
    /// [`ChannelError::RegistrationAborted`].
    pub fn unregister(&mut self, key: &RegistrantKey) -> Option<HardwareOp> {
        if !self.registrants.remove(key) {
            return None;
        }
        self.abort_waiters(key);
        if !self.registrants.is_empty() {
            return None;
        }

        // While registering, the completion notices the empty set
        if self.phase == Phase::Registered {
            self.phase = Phase::Unregistering;
            return Some(HardwareOp::Unregister);
        }
        None
    }

    /// Feed back the result of a hardware register.
    ///
    /// On failure every waiter of the attempt gets the error and their keys are
    /// removed, leaving no partial registration behind.
    pub fn register_completed(&mut self, outcome: RegisterOutcome) -> Option<HardwareOp> {
        let waiters = mem::take(&mut self.waiters);

        match outcome {
            Ok(()) => {
                for (_, waiter) in waiters {
                    let _ = waiter.send(Ok(()));
                }
                if self.registrants.is_empty() {
                    self.phase = Phase::Unregistering;
                    Some(HardwareOp::Unregister)
                } else {
                    self.phase = Phase::Registered;
                    None
                }
            }
            Err(error) => {
                for (key, waiter) in waiters {
                    self.registrants.remove(&key);
                    let _ = waiter.send(Err(error.clone()));
                }
                self.phase = Phase::Idle;
                None
            }
        }
    }

    /// Feed back the end of a hardware unregister, whatever its outcome
    pub fn unregister_completed(&mut self) -> Option<HardwareOp> {
        if self.registrants.is_empty() {
            self.phase = Phase::Idle;
            None
        } else {
            self.phase = Phase::Registering;
            Some(HardwareOp::Register)
        }
    }

    fn abort_waiters(&mut self, key: &RegistrantKey) {
        let (aborted, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.waiters)
            .into_iter()
            .partition(|(waiting, _)| waiting == key);
        self.waiters = kept;
        for (_, waiter) in aborted {
            let _ = waiter.send(Err(ChannelError::RegistrationAborted(key.to_string())));
        }
    }

    fn wait(&mut self, key: RegistrantKey) -> Ticket {
        let (tx, rx) = oneshot::channel();
        self.waiters.push((key, tx));
        Ticket::Pending(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::error::TransceiverError;

    fn key(name: &str) -> RegistrantKey {
        RegistrantKey::named(name)
    }

    fn failure() -> ChannelError {
        ChannelError::RegisterFailure {
            channel: "ir".into(),
            source: TransceiverError::Rejected("busy".into()),
        }
    }

    #[test]
    fn first_registrant_triggers_register() {
        let mut registration = Registration::new();
        let (ticket, op) = registration.register(key("a"));
        assert!(matches!(ticket, Ticket::Pending(_)));
        assert_eq!(op, Some(HardwareOp::Register));
        assert_eq!(registration.phase(), Phase::Registering);

        let (_, op) = registration.register(key("b"));
        assert_eq!(op, None);
        assert_eq!(registration.registrant_count(), 2);
    }

    #[test]
    fn completion_resolves_all_waiters() {
        let mut registration = Registration::new();
        let (first, _) = registration.register(key("a"));
        let (second, _) = registration.register(key("b"));

        assert_eq!(registration.register_completed(Ok(())), None);
        assert_eq!(registration.phase(), Phase::Registered);

        for ticket in [first, second] {
            let Ticket::Pending(mut rx) = ticket else {
                panic!("expected a pending ticket");
            };
            assert_eq!(rx.try_recv(), Ok(Ok(())));
        }

        let (ticket, op) = registration.register(key("c"));
        assert!(matches!(ticket, Ticket::Ready));
        assert_eq!(op, None);
    }

    #[test]
    fn last_registrant_leaving_unregisters() {
        let mut registration = Registration::new();
        registration.register(key("a"));
        registration.register(key("b"));
        registration.register_completed(Ok(()));

        assert_eq!(registration.unregister(&key("a")), None);
        assert_eq!(registration.unregister(&key("b")), Some(HardwareOp::Unregister));
        assert_eq!(registration.phase(), Phase::Unregistering);
        assert_eq!(registration.unregister_completed(), None);
        assert_eq!(registration.phase(), Phase::Idle);
    }

    #[test]
    fn unknown_key_is_ignored() {
        let mut registration = Registration::new();
        registration.register(key("a"));
        registration.register_completed(Ok(()));
        assert_eq!(registration.unregister(&key("ghost")), None);
        assert_eq!(registration.phase(), Phase::Registered);
    }

    #[test]
    fn unregister_during_register_runs_after_completion() {
        let mut registration = Registration::new();
        registration.register(key("a"));
        assert_eq!(registration.unregister(&key("a")), None);
        assert_eq!(
            registration.register_completed(Ok(())),
            Some(HardwareOp::Unregister)
        );
    }

    #[test]
    fn register_during_unregister_reregisters() {
        let mut registration = Registration::new();
        registration.register(key("a"));
        registration.register_completed(Ok(()));
        registration.unregister(&key("a"));

        let (ticket, op) = registration.register(key("b"));
        assert!(matches!(ticket, Ticket::Pending(_)));
        assert_eq!(op, None);
        assert_eq!(registration.unregister_completed(), Some(HardwareOp::Register));
        assert_eq!(registration.phase(), Phase::Registering);
    }

    #[test]
    fn failure_clears_every_waiter_key() {
        let mut registration = Registration::new();
        let (first, _) = registration.register(key("a"));
        registration.register(key("b"));

        assert_eq!(registration.register_completed(Err(failure())), None);
        assert_eq!(registration.phase(), Phase::Idle);
        assert_eq!(registration.registrant_count(), 0);

        let Ticket::Pending(mut rx) = first else {
            panic!("expected a pending ticket");
        };
        assert_eq!(rx.try_recv(), Ok(Err(failure())));
    }

    #[test]
    fn leaving_while_unregistering_aborts_the_wait() {
        let mut registration = Registration::new();
        registration.register(key("a"));
        registration.register_completed(Ok(()));
        assert_eq!(registration.unregister(&key("a")), Some(HardwareOp::Unregister));

        let (ticket, _) = registration.register(key("b"));
        assert_eq!(registration.unregister(&key("b")), None);
        assert_eq!(registration.unregister_completed(), None);
        assert_eq!(registration.phase(), Phase::Idle);

        let Ticket::Pending(mut rx) = ticket else {
            panic!("expected a pending ticket");
        };
        assert_eq!(
            rx.try_recv(),
            Ok(Err(ChannelError::RegistrationAborted("b".into())))
        );
    }

    #[test]
    fn transient_keys_are_unique() {
        assert_ne!(RegistrantKey::transient(), RegistrantKey::transient());
        assert!(RegistrantKey::consumer("lg").as_str().starts_with("lg#"));
    }
}
