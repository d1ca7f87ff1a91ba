//! Driver glue
//!
//! A [`CommandDriver`] owns one attached signal, the command resolver of its
//! family and the devices configured for it. It turns debounced inbound
//! commands into per-device [`DriverEvent`]s and logical device commands into
//! paced transmissions.

pub mod command_driver;
pub mod device;
pub mod error;
pub mod event;

pub use command_driver::CommandDriver;
pub use device::Device;
pub use error::DriverError;
pub use event::DriverEvent;
