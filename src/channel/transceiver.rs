//! Hardware seam: the physical half-duplex radio behind a channel

use async_trait::async_trait;

use super::error::TransceiverError;

/// The physical radio a [`Channel`](super::Channel) multiplexes.
///
/// Implementations are provided by the host platform. Every method suspends
/// only the calling operation; the channel keeps handling other events while
/// a call is outstanding.
#[async_trait]
pub trait Transceiver: Send + Sync + 'static {
    /// Tune the radio to this channel's frequency/protocol and start listening
    async fn register(&self) -> Result<(), TransceiverError>;

    /// Release the radio configuration
    async fn unregister(&self) -> Result<(), TransceiverError>;

    /// Transmit one raw frame
    async fn transmit(&self, frame: &[u8]) -> Result<(), TransceiverError>;

    /// Transmit a named command from the protocol's command set
    async fn send_command(&self, id: &str) -> Result<(), TransceiverError>;
}

/// Something the channel put on the air
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transmission {
    Payload(Vec<u8>),
    Command(String),
}

/// Inbound feeds delivered by the transceiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareEvent {
    /// Raw demodulated payload (one symbol per element)
    Payload(Vec<u8>),

    /// Raw command id recognised by the radio's protocol decoder
    Command(String),

    /// The radio finished a transmission
    Transmitted(Transmission),
}
