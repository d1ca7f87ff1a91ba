use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::channel::ChannelError;
use crate::command::{CommandDescriptor, CommandId};

/// What a driver reports to the host application
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A debounced inbound command meant for `device_id`
    DeviceCommand {
        device_id: String,
        command: CommandId,
        descriptor: Option<Arc<CommandDescriptor>>,
        received_at: DateTime<Local>,
    },

    /// A debounced raw payload
    Payload {
        payload: Vec<u8>,
        received_at: DateTime<Local>,
    },

    /// A command went out on the channel, with the devices it addresses
    CommandSent {
        command: CommandId,
        device_ids: Vec<String>,
        sent_at: DateTime<Local>,
    },

    /// A raw frame went out on the channel
    PayloadSent {
        payload: Vec<u8>,
        sent_at: DateTime<Local>,
    },

    SignalError {
        error: ChannelError,
        at: DateTime<Local>,
    },
}
