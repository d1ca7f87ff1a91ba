//! Per-consumer handle onto a shared channel.
//!
//! ```text
//! Configured ──attach()──► Attached ──detach()──► Detached
//! ```
//!
//! Attaching joins the channel's debounce window for the consumer's timeout.
//! Detaching releases the consumer's registration and window membership.

use std::sync::Arc;
use std::time::Duration;

use statum::{machine, state};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::ChannelError;
use super::event::SignalEvent;
use super::registration::RegistrantKey;
use super::registry::ChannelRegistry;
use super::shared::{Channel, ChannelSettings, Subscription};
use super::transceiver::Transceiver;

/// Consumer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSettings {
    /// Debounce timeout of the window this consumer joins; zero disables it
    pub debounce_time: Duration,

    /// Minimum spacing between transmissions, used if this consumer creates
    /// the channel
    pub min_tx_interval: Duration,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            debounce_time: Duration::from_millis(500),
            min_tx_interval: Duration::from_millis(100),
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SignalState {
    Configured,
    Attached,
    Detached,
}

#[machine]
#[derive(Debug)]
pub struct Signal<S: SignalState> {
    // Stable registrant key of this consumer
    key: RegistrantKey,

    // Key of the shared channel in the registry
    channel_key: String,

    settings: SignalSettings,

    // Populated while attached
    channel: Option<Arc<Channel>>,
    subscription: Option<Subscription>,
    events: Option<mpsc::UnboundedReceiver<SignalEvent>>,
}

impl<S: SignalState> Signal<S> {
    pub fn key(&self) -> &RegistrantKey {
        &self.key
    }

    pub fn channel_key(&self) -> &str {
        &self.channel_key
    }

    pub fn settings(&self) -> &SignalSettings {
        &self.settings
    }
}

impl Signal<Configured> {
    /// New consumer named `consumer` for the channel `channel_key`
    pub fn create(consumer: &str, channel_key: impl Into<String>, settings: SignalSettings) -> Self {
        let key = RegistrantKey::consumer(consumer);
        debug!("Creating signal consumer {} with settings: {:?}", key, settings);
        Self::new(key, channel_key.into(), settings, None, None, None)
    }

    /// Join the shared channel, creating it through `registry` if needed
    pub fn attach(
        mut self,
        registry: &ChannelRegistry,
        transceiver: Arc<dyn Transceiver>,
    ) -> Signal<Attached> {
        let channel = registry.get_or_create(
            &self.channel_key,
            transceiver,
            ChannelSettings {
                min_tx_interval: self.settings.min_tx_interval,
            },
        );
        let (subscription, events) =
            channel.subscribe(self.key.clone(), self.settings.debounce_time);

        info!(
            "[Signal {}] attached consumer {} (debounce {:?})",
            self.channel_key, self.key, self.settings.debounce_time
        );
        self.channel = Some(channel);
        self.subscription = Some(subscription);
        self.events = Some(events);
        self.transition()
    }
}

impl Signal<Attached> {
    pub fn channel(&self) -> Result<&Arc<Channel>, ChannelError> {
        self.channel
            .as_ref()
            .ok_or_else(|| ChannelError::NotAttached(self.key.to_string()))
    }

    /// Hold the radio for this consumer
    pub async fn register(&self) -> Result<(), ChannelError> {
        self.register_as(self.key.clone()).await
    }

    pub async fn register_as(&self, key: RegistrantKey) -> Result<(), ChannelError> {
        self.channel()?.register(key).await
    }

    pub fn unregister(&self) -> Result<(), ChannelError> {
        self.unregister_as(&self.key)
    }

    pub fn unregister_as(&self, key: &RegistrantKey) -> Result<(), ChannelError> {
        self.channel()?.unregister(key);
        Ok(())
    }

    pub async fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        self.channel()?.send(payload).await
    }

    pub async fn send_command(&self, id: &str) -> Result<(), ChannelError> {
        self.channel()?.send_command(id).await
    }

    /// Flip and return the channel's toggle bit
    pub fn next_toggle(&self) -> Result<bool, ChannelError> {
        Ok(self.channel()?.next_toggle())
    }

    pub fn pause_debouncers(&self) -> Result<(), ChannelError> {
        self.channel()?.pause_debouncers();
        Ok(())
    }

    pub fn resume_debouncers(&self) -> Result<(), ChannelError> {
        self.channel()?.resume_debouncers();
        Ok(())
    }

    /// Mute inbound events for `timeout`, for every consumer of the channel
    /// when `all` is set, otherwise for this consumer only.
    pub fn manual_debounce(&self, timeout: Duration, all: bool) -> Result<(), ChannelError> {
        if all {
            self.channel()?.manual_debounce(timeout);
            return Ok(());
        }
        match &self.subscription {
            Some(subscription) => {
                subscription.manual_debounce(timeout);
                Ok(())
            }
            None => Err(ChannelError::NotAttached(self.key.to_string())),
        }
    }

    /// Next event for this consumer; `None` once the receiver was taken
    pub async fn recv(&mut self) -> Option<SignalEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    pub fn try_recv(&mut self) -> Option<SignalEvent> {
        self.events.as_mut().and_then(|events| events.try_recv().ok())
    }

    /// Move the event receiver out, e.g. into an event loop task
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SignalEvent>> {
        self.events.take()
    }

    /// Release this consumer's registration and leave the debounce window.
    ///
    /// Dropping an attached signal has the same effect on the channel.
    pub fn detach(mut self) -> Signal<Detached> {
        match self.subscription.take() {
            Some(subscription) => {
                drop(subscription);
                info!("[Signal {}] detached consumer {}", self.channel_key, self.key);
            }
            None => warn!("Signal {} detached without a channel", self.key),
        }
        self.channel = None;
        self.events = None;
        self.transition()
    }
}

impl Signal<Detached> {
    /// Start over with the same settings and a fresh key
    pub fn reconfigure(self, consumer: &str) -> Signal<Configured> {
        Signal::<Configured>::create(consumer, self.channel_key.clone(), self.settings.clone())
    }
}
