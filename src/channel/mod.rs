//! Shared channel subsystem
//!
//! A [`Channel`] is the single logical handle onto one physical radio
//! configuration. Every consumer (one per configured device model) talks to it
//! through its own [`Signal`]:
//!
//! 1. [`registry`] - explicit context mapping channel keys to shared channels
//! 2. [`registration`] - Idle/Registering/Registered/Unregistering coordinator
//! 3. [`debounce`] - per-timeout duplicate suppression windows
//! 4. [`pacing`] - minimum spacing between outbound transmissions
//! 5. [`signal`] - per-consumer handle with a typestate lifecycle
//!
//! # Architecture
//!
//! ```text
//! HardwareEvent ──► Channel ──► DebounceWindow(500ms) ──► Signal A, Signal B
//!                      │    └──► DebounceWindow(250ms) ──► Signal C
//!                      │
//!   send() ──► transient registration ──► Pacer ──► Transceiver::transmit
//! ```

pub mod debounce;
pub mod error;
pub mod event;
pub mod loopback;
pub mod pacing;
pub mod registration;
pub mod registry;
pub mod reporter;
pub mod shared;
pub mod signal;
pub mod suppression;
pub mod transceiver;

pub use shared::{Channel, ChannelSettings, Subscription};
pub use debounce::{DebounceWindow, Debouncer, DebouncerState, Fingerprint};
pub use error::{ChannelError, TransceiverError};
pub use event::SignalEvent;
pub use loopback::LoopbackTransceiver;
pub use pacing::Pacer;
pub use registration::{Phase, RegistrantKey};
pub use registry::ChannelRegistry;
pub use reporter::{ErrorReporter, TracingReporter};
pub use signal::{Attached, Configured, Detached, Signal, SignalSettings, SignalState};
pub use transceiver::{HardwareEvent, Transceiver, Transmission};
