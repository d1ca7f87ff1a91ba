//! Shared radio channel arbitration for device-family drivers.
//!
//! One physical half-duplex transceiver is multiplexed across many logical
//! consumers. The crate is split into three layers:
//!
//! 1. [`channel`] - registration reference counting, debounce windows, pacing
//! 2. [`command`] - the type/subtype command taxonomy and its lookups
//! 3. [`driver`] - glue that routes debounced commands to configured devices
//!
//! ```text
//! Transceiver ──► Channel ──► DebounceWindow ──► Signal ──► CommandDriver
//!      ▲                                                        │
//!      └────────────── paced send ◄── transient registration ◄──┘
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod driver;

pub use channel::{
    Channel, ChannelError, ChannelRegistry, ChannelSettings, HardwareEvent, Signal, SignalEvent,
    Transceiver, TransceiverError, Transmission,
};
pub use command::{CommandDescriptor, CommandError, CommandId, CommandResolver};
pub use config::{ConfigError, DriverConfig};
pub use driver::{CommandDriver, Device, DriverError, DriverEvent};
