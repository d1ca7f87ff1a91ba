use chrono::{DateTime, Local};

use super::error::ChannelError;
use super::transceiver::Transmission;

/// What a consumer receives from its [`Signal`](super::Signal)
#[derive(Debug, Clone)]
pub enum SignalEvent {
    /// A debounced raw payload
    Payload {
        payload: Vec<u8>,
        received_at: DateTime<Local>,
    },

    /// A debounced raw command id (still carrying any toggle variant marker)
    Command {
        id: String,
        received_at: DateTime<Local>,
    },

    /// Something was put on the air by any consumer of the channel
    Transmitted {
        transmission: Transmission,
        sent_at: DateTime<Local>,
    },

    /// A channel-level failure, fanned out to every consumer
    Error {
        error: ChannelError,
        at: DateTime<Local>,
    },
}

impl SignalEvent {
    pub fn payload(payload: Vec<u8>) -> Self {
        Self::Payload {
            payload,
            received_at: Local::now(),
        }
    }

    pub fn command(id: impl Into<String>) -> Self {
        Self::Command {
            id: id.into(),
            received_at: Local::now(),
        }
    }

    pub fn transmitted(transmission: Transmission) -> Self {
        Self::Transmitted {
            transmission,
            sent_at: Local::now(),
        }
    }

    pub fn error(error: ChannelError) -> Self {
        Self::Error {
            error,
            at: Local::now(),
        }
    }

    /// Inbound events go through debounce and suppression, the rest do not
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Payload { .. } | Self::Command { .. })
    }
}
