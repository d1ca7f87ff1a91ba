//! In-process transceiver used by the demo binary.
//!
//! Everything "transmitted" is echoed back as an inbound event, the way a
//! receiver sitting next to the sender would hear it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::error::TransceiverError;
use super::transceiver::{HardwareEvent, Transceiver};

const FEED_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct LoopbackTransceiver {
    echo: mpsc::Sender<HardwareEvent>,
    registered: AtomicBool,
}

impl LoopbackTransceiver {
    /// The receiver is the inbound feed, meant for `Channel::attach_feed`
    pub fn new() -> (Self, mpsc::Receiver<HardwareEvent>) {
        let (echo, feed) = mpsc::channel(FEED_CAPACITY);
        let transceiver = Self {
            echo,
            registered: AtomicBool::new(false),
        };
        (transceiver, feed)
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn echo(&self, event: HardwareEvent) -> Result<(), TransceiverError> {
        if !self.is_registered() {
            return Err(TransceiverError::Rejected("radio not registered".into()));
        }
        self.echo
            .send(event)
            .await
            .map_err(|e| TransceiverError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl Transceiver for LoopbackTransceiver {
    async fn register(&self) -> Result<(), TransceiverError> {
        info!("Loopback radio registered");
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unregister(&self) -> Result<(), TransceiverError> {
        info!("Loopback radio released");
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn transmit(&self, frame: &[u8]) -> Result<(), TransceiverError> {
        debug!("Loopback frame: {:?}", frame);
        self.echo(HardwareEvent::Payload(frame.to_vec())).await
    }

    async fn send_command(&self, id: &str) -> Result<(), TransceiverError> {
        debug!("Loopback command: {}", id);
        self.echo(HardwareEvent::Command(id.to_owned())).await
    }
}
