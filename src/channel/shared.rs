//! The shared channel: one per physical radio configuration

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::debounce::{Arm, DebounceWindow, Fingerprint, Subscriber};
use super::error::ChannelError;
use super::event::SignalEvent;
use super::pacing::Pacer;
use super::registration::{HardwareOp, Phase, RegistrantKey, Registration, Ticket};
use super::reporter::ErrorReporter;
use super::suppression::Suppression;
use super::transceiver::{HardwareEvent, Transceiver, Transmission};

/// Interval of the periodic sweep of finished debounce entries
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Own sends still waiting for the radio's transmit-completed echo
const UNCONFIRMED_CAPACITY: usize = 32;

/// Per-channel settings, fixed by the first consumer that creates the channel
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Minimum spacing between two transmissions
    pub min_tx_interval: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            min_tx_interval: Duration::from_millis(100),
        }
    }
}

struct ChannelState {
    registration: Registration,
    windows: HashMap<Duration, DebounceWindow>,
    pacer: Pacer,
    suppression: Suppression,
    toggle: bool,
    next_subscriber: u64,
    unconfirmed: VecDeque<Transmission>,
}

/// One logical handle onto a physical radio configuration.
///
/// All mutable state sits behind a single lock that is never held across an
/// await point; hardware calls run in spawned tasks and report back.
pub struct Channel {
    key: String,
    transceiver: Arc<dyn Transceiver>,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<ChannelState>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Create a channel and start its periodic sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        key: impl Into<String>,
        transceiver: Arc<dyn Transceiver>,
        reporter: Arc<dyn ErrorReporter>,
        settings: ChannelSettings,
    ) -> Arc<Self> {
        let channel = Arc::new(Self {
            key: key.into(),
            transceiver,
            reporter,
            state: Mutex::new(ChannelState {
                registration: Registration::new(),
                windows: HashMap::new(),
                pacer: Pacer::new(settings.min_tx_interval),
                suppression: Suppression::default(),
                toggle: false,
                next_subscriber: 0,
                unconfirmed: VecDeque::new(),
            }),
        });
        info!(
            "[Signal {}] channel created, min tx interval {:?}",
            channel.key, settings.min_tx_interval
        );
        Self::spawn_sweeper(Arc::downgrade(&channel));
        channel
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().registration.phase()
    }

    pub fn registrant_count(&self) -> usize {
        self.state.lock().registration.registrant_count()
    }

    pub fn is_registered(&self, key: &RegistrantKey) -> bool {
        self.state.lock().registration.contains(key)
    }

    /// Distinct debounce windows currently alive
    pub fn window_count(&self) -> usize {
        self.state.lock().windows.len()
    }

    /// Consumers attached to the window of `timeout`
    pub fn window_refcount(&self, timeout: Duration) -> usize {
        self.state
            .lock()
            .windows
            .get(&timeout)
            .map_or(0, DebounceWindow::refcount)
    }

    /// Tracked debounce entries across every window
    pub fn debounce_entry_count(&self) -> usize {
        self.state
            .lock()
            .windows
            .values()
            .map(DebounceWindow::entry_count)
            .sum()
    }

    // Registration

    /// Add `key` to the registrant set, registering the hardware if needed.
    ///
    /// Resolves once the hardware is registered. Concurrent callers share a
    /// single in-flight hardware register.
    pub async fn register(self: &Arc<Self>, key: RegistrantKey) -> Result<(), ChannelError> {
        let (ticket, op) = self.state.lock().registration.register(key);
        self.start(op);

        match ticket {
            Ticket::Ready => Ok(()),
            Ticket::Pending(rx) => match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ChannelError::RegistrationAborted(self.key.clone())),
            },
        }
    }

    /// Remove `key`; the hardware is released once nobody holds it anymore
    pub fn unregister(self: &Arc<Self>, key: &RegistrantKey) {
        let op = self.state.lock().registration.unregister(key);
        self.start(op);
    }

    fn start(self: &Arc<Self>, op: Option<HardwareOp>) {
        match op {
            Some(HardwareOp::Register) => self.spawn_register(),
            Some(HardwareOp::Unregister) => self.spawn_unregister(),
            None => {}
        }
    }

    fn spawn_register(self: &Arc<Self>) {
        let channel = Arc::clone(self);
        tokio::spawn(async move {
            info!("[Signal {}] registering signal", channel.key);
            let outcome = channel.transceiver.register().await.map_err(|source| {
                ChannelError::RegisterFailure {
                    channel: channel.key.clone(),
                    source,
                }
            });
            match &outcome {
                Ok(()) => info!("[Signal {}] registered signal", channel.key),
                Err(e) => error!("{}", e),
            }

            let next = channel.state.lock().registration.register_completed(outcome);
            channel.start(next);
        });
    }

    fn spawn_unregister(self: &Arc<Self>) {
        let channel = Arc::clone(self);
        tokio::spawn(async move {
            info!("[Signal {}] unregistering signal", channel.key);
            match channel.transceiver.unregister().await {
                Ok(()) => info!("[Signal {}] unregistered signal", channel.key),
                Err(source) => channel.reporter.report(&ChannelError::UnregisterFailure {
                    channel: channel.key.clone(),
                    source,
                }),
            }

            let next = channel.state.lock().registration.unregister_completed();
            channel.start(next);
        });
    }

    // Inbound

    /// Route one hardware event to the consumers
    pub fn ingest(self: &Arc<Self>, event: HardwareEvent) {
        match event {
            HardwareEvent::Payload(payload) => {
                let fingerprint = Fingerprint::of_payload(&payload);
                self.admit(fingerprint, SignalEvent::payload(payload));
            }
            HardwareEvent::Command(id) => {
                let fingerprint = Fingerprint::of_command(&id);
                self.admit(fingerprint, SignalEvent::command(id));
            }
            // Own sends are announced by `transmit`, only foreign ones go out here
            HardwareEvent::Transmitted(transmission) => {
                if self.confirm(&transmission) {
                    debug!("[Signal {}] radio confirmed {:?}", self.key, transmission);
                } else {
                    self.broadcast(SignalEvent::transmitted(transmission));
                }
            }
        }
    }

    /// Pump a hardware feed into the channel until the feed closes
    pub fn attach_feed(self: &Arc<Self>, mut feed: mpsc::Receiver<HardwareEvent>) -> JoinHandle<()> {
        let channel = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                let Some(channel) = channel.upgrade() else {
                    break;
                };
                channel.ingest(event);
            }
            debug!("Hardware feed closed");
        })
    }

    fn admit(self: &Arc<Self>, fingerprint: Fingerprint, event: SignalEvent) {
        let now = Instant::now();
        let mut arms = Vec::new();
        {
            let mut state = self.state.lock();
            let channel_muted = state.suppression.is_active(now);
            if channel_muted {
                debug!("[Signal {}] manually debounced {}", self.key, fingerprint);
            }

            for (timeout, window) in state.windows.iter_mut() {
                let verdict = window.admit(fingerprint.clone(), now);
                if let Some(arm) = verdict.arm {
                    arms.push((*timeout, arm));
                }
                if verdict.emit {
                    debug!(
                        "[Signal {} ~{}ms] emitting {}",
                        self.key,
                        timeout.as_millis(),
                        fingerprint
                    );
                    window.publish(&event, now, channel_muted);
                }
            }
        }

        for (timeout, arm) in arms {
            self.schedule_expiry(timeout, arm);
        }
    }

    fn schedule_expiry(self: &Arc<Self>, timeout: Duration, arm: Arm) {
        let channel = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(arm.deadline).await;
            if let Some(channel) = channel.upgrade() {
                let mut state = channel.state.lock();
                if let Some(window) = state.windows.get_mut(&timeout) {
                    window.expire(&arm, Instant::now());
                }
            }
        });
    }

    /// Fan an event out to every consumer, bypassing debounce
    fn broadcast(&self, event: SignalEvent) {
        let now = Instant::now();
        let state = self.state.lock();
        for window in state.windows.values() {
            window.publish(&event, now, false);
        }
    }

    // Subscriptions

    /// Join the window of `timeout` on behalf of `key`.
    ///
    /// Dropping the returned subscription also releases any registration
    /// still held under `key`.
    pub(crate) fn subscribe(
        self: &Arc<Self>,
        key: RegistrantKey,
        timeout: Duration,
    ) -> (Subscription, mpsc::UnboundedReceiver<SignalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let id = state.next_subscriber;
        state.next_subscriber += 1;

        let window = state.windows.entry(timeout).or_insert_with(|| {
            info!(
                "[Signal {}] new debounce window ~{}ms",
                self.key,
                timeout.as_millis()
            );
            DebounceWindow::new(timeout)
        });
        window.subscribe(Subscriber {
            id,
            sender: tx,
            suppression: Suppression::default(),
        });

        let subscription = Subscription {
            channel: Arc::clone(self),
            key,
            timeout,
            id,
        };
        (subscription, rx)
    }

    fn unsubscribe(&self, timeout: Duration, id: u64) {
        let mut state = self.state.lock();
        let drained = match state.windows.get_mut(&timeout) {
            Some(window) => window.unsubscribe(id),
            None => return,
        };
        if drained {
            state.windows.remove(&timeout);
            info!(
                "[Signal {}] dropped debounce window ~{}ms",
                self.key,
                timeout.as_millis()
            );
        }
    }

    fn suppress_subscriber(&self, timeout: Duration, id: u64, duration: Duration) {
        let now = Instant::now();
        let mut state = self.state.lock();
        match state
            .windows
            .get_mut(&timeout)
            .and_then(|window| window.subscriber_mut(id))
        {
            Some(subscriber) => subscriber.suppression.arm(now, duration),
            None => warn!("[Signal {}] unknown subscriber {}", self.key, id),
        }
    }

    // Debounce control

    /// Suppress inbound emission for every consumer of the channel
    pub fn manual_debounce(&self, duration: Duration) {
        debug!("[Signal {}] manual debounce for {:?}", self.key, duration);
        self.state.lock().suppression.arm(Instant::now(), duration);
    }

    /// Freeze every active debouncer of every window
    pub fn pause_debouncers(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();
        for window in state.windows.values_mut() {
            window.pause_all(now);
        }
        debug!("[Signal {}] paused debouncers", self.key);
    }

    /// Resume every paused debouncer with its remaining time
    pub fn resume_debouncers(self: &Arc<Self>) {
        let now = Instant::now();
        let arms: Vec<(Duration, Arm)> = {
            let mut state = self.state.lock();
            state
                .windows
                .iter_mut()
                .flat_map(|(timeout, window)| {
                    let timeout = *timeout;
                    window
                        .resume_all(now)
                        .into_iter()
                        .map(move |arm| (timeout, arm))
                })
                .collect()
        };
        debug!("[Signal {}] resumed {} debouncers", self.key, arms.len());
        for (timeout, arm) in arms {
            self.schedule_expiry(timeout, arm);
        }
    }

    /// Drop every finished debounce entry; returns how many went away
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        state
            .windows
            .values_mut()
            .map(|window| window.sweep(now))
            .sum()
    }

    fn spawn_sweeper(channel: Weak<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + SWEEP_INTERVAL, SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let Some(channel) = channel.upgrade() else {
                    break;
                };
                let removed = channel.sweep();
                if removed > 0 {
                    debug!("[Signal {}] swept {} debouncers", channel.key, removed);
                }
            }
        });
    }

    // Outbound

    /// Flip and return the channel's toggle bit
    pub fn next_toggle(&self) -> bool {
        let mut state = self.state.lock();
        state.toggle = !state.toggle;
        state.toggle
    }

    /// Transmit a raw frame under a transient registration
    pub async fn send(self: &Arc<Self>, payload: &[u8]) -> Result<(), ChannelError> {
        if payload.is_empty() {
            return Err(ChannelError::InvalidFrame {
                channel: self.key.clone(),
                reason: "empty payload".into(),
            });
        }
        let transmission = Transmission::Payload(payload.to_vec());
        self.transmit(transmission).await
    }

    /// Transmit a named command under a transient registration
    pub async fn send_command(self: &Arc<Self>, id: &str) -> Result<(), ChannelError> {
        if id.trim().is_empty() {
            return Err(ChannelError::InvalidFrame {
                channel: self.key.clone(),
                reason: "blank command id".into(),
            });
        }
        self.transmit(Transmission::Command(id.to_owned())).await
    }

    async fn transmit(self: &Arc<Self>, transmission: Transmission) -> Result<(), ChannelError> {
        let key = RegistrantKey::transient();

        if let Err(e) = self.register(key.clone()).await {
            self.unregister(&key);
            self.broadcast(SignalEvent::error(e.clone()));
            return Err(e);
        }

        let wait = self.state.lock().pacer.reserve(Instant::now());
        if !wait.is_zero() {
            debug!("[Signal {}] pacing transmission by {:?}", self.key, wait);
            tokio::time::sleep(wait).await;
        }

        self.expect_confirmation(&transmission);
        let result = match &transmission {
            Transmission::Payload(frame) => self.transceiver.transmit(frame).await,
            Transmission::Command(id) => self.transceiver.send_command(id).await,
        };
        self.unregister(&key);
        if result.is_err() {
            self.confirm(&transmission);
        }

        match result {
            Ok(()) => {
                info!("[Signal {}] sent {:?}", self.key, transmission);
                self.broadcast(SignalEvent::transmitted(transmission));
                Ok(())
            }
            Err(source) => {
                let e = ChannelError::TransmitFailure {
                    channel: self.key.clone(),
                    source,
                };
                error!("{}", e);
                self.broadcast(SignalEvent::error(e.clone()));
                Err(e)
            }
        }
    }

    fn expect_confirmation(&self, transmission: &Transmission) {
        let mut state = self.state.lock();
        if state.unconfirmed.len() == UNCONFIRMED_CAPACITY {
            state.unconfirmed.pop_front();
        }
        state.unconfirmed.push_back(transmission.clone());
    }

    /// Settle one own send matching `transmission`; false if there is none
    fn confirm(&self, transmission: &Transmission) -> bool {
        let mut state = self.state.lock();
        match state.unconfirmed.iter().position(|sent| sent == transmission) {
            Some(index) => {
                state.unconfirmed.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A consumer's membership in a debounce window.
///
/// Leaving is tied to drop, which also gives up the consumer's registration.
#[derive(Debug)]
pub struct Subscription {
    channel: Arc<Channel>,
    key: RegistrantKey,
    timeout: Duration,
    id: u64,
}

impl Subscription {
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Suppress inbound emission for this consumer only
    pub fn manual_debounce(&self, duration: Duration) {
        self.channel
            .suppress_subscriber(self.timeout, self.id, duration);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.unregister(&self.key);
        self.channel.unsubscribe(self.timeout, self.id);
    }
}
