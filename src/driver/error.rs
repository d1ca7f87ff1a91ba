use thiserror::Error;

use crate::channel::ChannelError;
use crate::command::CommandError;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Event loop of driver {0} is already running")]
    AlreadyRunning(String),
}
