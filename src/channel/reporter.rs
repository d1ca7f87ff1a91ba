//! Process-wide sink for errors that have no caller to return to

use tracing::error;

use super::error::ChannelError;

/// Receives errors raised inside internally scheduled continuations
/// (hardware unregister, feed pumps) so they are never silently dropped.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: &ChannelError);
}

/// Default reporter: logs through `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &ChannelError) {
        error!("{}", error);
    }
}
