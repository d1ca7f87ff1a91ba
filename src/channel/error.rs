//! Error definitions for the channel subsystem

use thiserror::Error;

/// Failure reported by the hardware collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransceiverError {
    /// The radio refused the request (busy, invalid frame length, ...)
    #[error("hardware rejected request: {0}")]
    Rejected(String),

    /// The radio is gone or not answering
    #[error("transceiver unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by a [`Channel`](super::Channel) to its consumers
///
/// Cloneable because a single register failure is delivered to every caller
/// waiting on the same hardware operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Hardware register failed; delivered to the trigger and all co-waiters
    #[error("[Signal {channel}] register failed: {source}")]
    RegisterFailure {
        channel: String,
        source: TransceiverError,
    },

    /// Hardware unregister failed; only ever handed to the error reporter
    #[error("[Signal {channel}] unregister failed: {source}")]
    UnregisterFailure {
        channel: String,
        source: TransceiverError,
    },

    /// Hardware transmit failed for one send
    #[error("[Signal {channel}] transmit failed: {source}")]
    TransmitFailure {
        channel: String,
        source: TransceiverError,
    },

    /// Frame rejected before any hardware call was made
    #[error("[Signal {channel}] invalid frame: {reason}")]
    InvalidFrame { channel: String, reason: String },

    /// The register request was dropped or withdrawn before it resolved
    #[error("[Signal {0}] register request aborted")]
    RegistrationAborted(String),

    /// The consumer handle is not attached to a channel
    #[error("signal {0} is not attached to a channel")]
    NotAttached(String),
}
