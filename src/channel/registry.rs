use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::reporter::{ErrorReporter, TracingReporter};
use super::shared::{Channel, ChannelSettings};
use super::transceiver::Transceiver;

/// Explicit context mapping channel keys to their shared [`Channel`].
///
/// Owned by the process entry point and handed to every consumer that needs
/// a channel. The first accessor of a key creates the channel, everyone after
/// that gets the same `Arc`.
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Arc<Channel>>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.keys())
            .finish_non_exhaustive()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(TracingReporter))
    }

    pub fn with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            reporter,
        }
    }

    /// Shared channel for `key`, created on first use.
    ///
    /// `transceiver` and `settings` only matter for the call that creates the
    /// channel; later calls ignore them.
    pub fn get_or_create(
        &self,
        key: &str,
        transceiver: Arc<dyn Transceiver>,
        settings: ChannelSettings,
    ) -> Arc<Channel> {
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get(key) {
            debug!("[Signal {}] reusing shared channel", key);
            return Arc::clone(channel);
        }

        let channel = Channel::new(key, transceiver, Arc::clone(&self.reporter), settings);
        channels.insert(key.to_owned(), Arc::clone(&channel));
        channel
    }

    pub fn get(&self, key: &str) -> Option<Arc<Channel>> {
        self.channels.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.channels.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::loopback::LoopbackTransceiver;

    #[tokio::test]
    async fn same_key_shares_one_channel() {
        let registry = ChannelRegistry::new();
        let (radio, _feed) = LoopbackTransceiver::new();
        let radio: Arc<dyn Transceiver> = Arc::new(radio);

        let first = registry.get_or_create("ir", Arc::clone(&radio), ChannelSettings::default());
        let second = registry.get_or_create("ir", Arc::clone(&radio), ChannelSettings::default());
        let other = registry.get_or_create("433", radio, ChannelSettings::default());

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.keys(), vec!["433".to_string(), "ir".to_string()]);
        assert!(registry.get("868").is_none());
    }
}
