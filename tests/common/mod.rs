#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use radiomux::channel::{ChannelError, ErrorReporter, Transceiver, TransceiverError};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register,
    Unregister,
    Transmit(Vec<u8>),
    Command(String),
}

/// Transceiver double that records every call with its (paused) timestamp
#[derive(Debug, Default)]
pub struct MockTransceiver {
    calls: Mutex<Vec<(Call, Instant)>>,
    delay: Duration,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
    registered: AtomicBool,
    fail_register: AtomicBool,
    fail_unregister: AtomicBool,
    fail_transmit: AtomicBool,
}

impl MockTransceiver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every register/unregister takes `delay` to complete
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn fail_unregister(&self, fail: bool) {
        self.fail_unregister.store(fail, Ordering::SeqCst);
    }

    pub fn fail_transmit(&self, fail: bool) {
        self.fail_transmit.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.lock().iter().filter(|(call, _)| call == wanted).count()
    }

    /// Register/unregister calls only, in order
    pub fn lifecycle(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Register | Call::Unregister))
            .collect()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Whether two register/unregister calls were ever in flight together
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((call, Instant::now()));
    }

    async fn lifecycle_call(&self, call: Call, fail: &AtomicBool) -> Result<(), TransceiverError> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.record(call.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail.load(Ordering::SeqCst) {
            return Err(TransceiverError::Rejected(format!("{call:?} refused")));
        }
        self.registered
            .store(call == Call::Register, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Transceiver for MockTransceiver {
    async fn register(&self) -> Result<(), TransceiverError> {
        self.lifecycle_call(Call::Register, &self.fail_register).await
    }

    async fn unregister(&self) -> Result<(), TransceiverError> {
        self.lifecycle_call(Call::Unregister, &self.fail_unregister).await
    }

    async fn transmit(&self, frame: &[u8]) -> Result<(), TransceiverError> {
        self.record(Call::Transmit(frame.to_vec()));
        if self.fail_transmit.load(Ordering::SeqCst) {
            return Err(TransceiverError::Unavailable("antenna unplugged".into()));
        }
        Ok(())
    }

    async fn send_command(&self, id: &str) -> Result<(), TransceiverError> {
        self.record(Call::Command(id.to_owned()));
        if self.fail_transmit.load(Ordering::SeqCst) {
            return Err(TransceiverError::Unavailable("antenna unplugged".into()));
        }
        Ok(())
    }
}

/// Reporter that keeps what it was handed
#[derive(Debug, Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<ChannelError>>,
}

impl RecordingReporter {
    pub fn errors(&self) -> Vec<ChannelError> {
        self.errors.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &ChannelError) {
        self.errors.lock().push(error.clone());
    }
}

/// Let spawned hardware tasks and timers run under paused time
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1_000)).await;
}
