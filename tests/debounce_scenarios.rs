mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockTransceiver;
use radiomux::channel::{
    Attached, ChannelRegistry, Configured, HardwareEvent, Signal, SignalEvent, SignalSettings, Transmission,
};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn consumer(registry: &ChannelRegistry, mock: &Arc<MockTransceiver>, debounce: u64) -> Signal<Attached> {
    let settings = SignalSettings {
        debounce_time: ms(debounce),
        ..SignalSettings::default()
    };
    Signal::<Configured>::create("consumer", "433", settings).attach(registry, mock.clone())
}

/// Everything the consumer has received so far
fn drain(signal: &mut Signal<Attached>) -> Vec<SignalEvent> {
    std::iter::from_fn(|| signal.try_recv()).collect()
}

fn payloads(events: &[SignalEvent]) -> Vec<Vec<u8>> {
    events
        .iter()
        .filter_map(|event| match event {
            SignalEvent::Payload { payload, .. } => Some(payload.clone()),
            _ => None,
        })
        .collect()
}

fn commands(events: &[SignalEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SignalEvent::Command { id, .. } => Some(id.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn repeated_payload_emits_once_to_every_consumer() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut a = consumer(&registry, &mock, 500);
    let mut b = consumer(&registry, &mock, 500);
    let channel = a.channel().unwrap().clone();
    assert_eq!(channel.window_count(), 1);
    assert_eq!(channel.window_refcount(ms(500)), 2);

    channel.ingest(HardwareEvent::Payload(vec![1, 0, 1, 0]));
    tokio::time::sleep(ms(100)).await;
    channel.ingest(HardwareEvent::Payload(vec![1, 0, 1, 0]));

    assert_eq!(payloads(&drain(&mut a)), vec![vec![1, 0, 1, 0]]);
    assert_eq!(payloads(&drain(&mut b)), vec![vec![1, 0, 1, 0]]);
}

#[tokio::test(start_paused = true)]
async fn repeats_keep_window_open_until_quiet() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut signal = consumer(&registry, &mock, 500);
    let channel = signal.channel().unwrap().clone();

    // Held button: a repeat every 300ms never lets the timer run out
    for _ in 0..5 {
        channel.ingest(HardwareEvent::Command("VOLUME_UP".into()));
        tokio::time::sleep(ms(300)).await;
    }
    assert_eq!(commands(&drain(&mut signal)), vec!["VOLUME_UP"]);

    tokio::time::sleep(ms(600)).await;
    assert_eq!(channel.debounce_entry_count(), 0);

    channel.ingest(HardwareEvent::Command("VOLUME_UP".into()));
    assert_eq!(commands(&drain(&mut signal)), vec!["VOLUME_UP"]);
}

#[tokio::test(start_paused = true)]
async fn windows_are_per_timeout() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut slow = consumer(&registry, &mock, 500);
    let mut raw = consumer(&registry, &mock, 0);
    let channel = slow.channel().unwrap().clone();
    assert_eq!(channel.window_count(), 2);

    channel.ingest(HardwareEvent::Command("OK".into()));
    channel.ingest(HardwareEvent::Command("OK".into()));
    assert_eq!(commands(&drain(&mut slow)).len(), 1);
    assert_eq!(commands(&drain(&mut raw)).len(), 2);

    let _detached = raw.detach();
    assert_eq!(channel.window_count(), 1);
    assert_eq!(channel.window_refcount(ms(0)), 0);
}

#[tokio::test(start_paused = true)]
async fn payload_and_command_fingerprints_do_not_collide() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut signal = consumer(&registry, &mock, 500);
    let channel = signal.channel().unwrap().clone();

    channel.ingest(HardwareEvent::Payload(vec![1, 2]));
    channel.ingest(HardwareEvent::Command("12".into()));

    let events = drain(&mut signal);
    assert_eq!(payloads(&events).len(), 1);
    assert_eq!(commands(&events).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn paused_debouncers_never_reemit() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut signal = consumer(&registry, &mock, 500);
    let channel = signal.channel().unwrap().clone();

    channel.ingest(HardwareEvent::Command("MUTE".into()));
    signal.pause_debouncers().unwrap();
    tokio::time::sleep(ms(2_000)).await;

    channel.ingest(HardwareEvent::Command("MUTE".into()));
    assert_eq!(commands(&drain(&mut signal)), vec!["MUTE"]);

    signal.resume_debouncers().unwrap();
    tokio::time::sleep(ms(100)).await;
    channel.ingest(HardwareEvent::Command("MUTE".into()));
    assert!(commands(&drain(&mut signal)).is_empty());

    tokio::time::sleep(ms(600)).await;
    channel.ingest(HardwareEvent::Command("MUTE".into()));
    assert_eq!(commands(&drain(&mut signal)), vec!["MUTE"]);
}

#[tokio::test(start_paused = true)]
async fn channel_wide_manual_debounce_mutes_everyone() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut a = consumer(&registry, &mock, 500);
    let mut b = consumer(&registry, &mock, 500);
    let channel = a.channel().unwrap().clone();

    a.manual_debounce(ms(300), true).unwrap();
    channel.ingest(HardwareEvent::Command("POWER".into()));
    assert!(drain(&mut a).is_empty());
    assert!(drain(&mut b).is_empty());

    tokio::time::sleep(ms(301)).await;
    channel.ingest(HardwareEvent::Command("INPUT".into()));
    assert_eq!(commands(&drain(&mut a)), vec!["INPUT"]);
    assert_eq!(commands(&drain(&mut b)), vec!["INPUT"]);
}

#[tokio::test(start_paused = true)]
async fn self_scoped_manual_debounce_mutes_only_caller() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut a = consumer(&registry, &mock, 500);
    let mut b = consumer(&registry, &mock, 500);
    let channel = a.channel().unwrap().clone();

    a.manual_debounce(ms(300), false).unwrap();
    channel.ingest(HardwareEvent::Command("POWER".into()));
    assert!(drain(&mut a).is_empty());
    assert_eq!(commands(&drain(&mut b)), vec!["POWER"]);
}

#[tokio::test(start_paused = true)]
async fn rearming_manual_debounce_replaces_expiry() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut signal = consumer(&registry, &mock, 500);
    let channel = signal.channel().unwrap().clone();

    signal.manual_debounce(ms(300), true).unwrap();
    tokio::time::sleep(ms(100)).await;
    signal.manual_debounce(ms(100), true).unwrap();

    tokio::time::sleep(ms(150)).await;
    channel.ingest(HardwareEvent::Command("POWER".into()));
    assert_eq!(commands(&drain(&mut signal)), vec!["POWER"]);
}

#[tokio::test(start_paused = true)]
async fn transmissions_bypass_debounce_and_suppression() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut a = consumer(&registry, &mock, 500);
    let mut b = consumer(&registry, &mock, 250);
    let channel = a.channel().unwrap().clone();

    a.manual_debounce(ms(1_000), true).unwrap();
    for _ in 0..2 {
        channel.ingest(HardwareEvent::Transmitted(Transmission::Command("MUTE".into())));
    }

    for signal in [&mut a, &mut b] {
        let events = drain(signal);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|event| matches!(event, SignalEvent::Transmitted { .. })));
    }
}

#[tokio::test(start_paused = true)]
async fn feed_pump_ingests_hardware_events() {
    let registry = ChannelRegistry::new();
    let mock = MockTransceiver::new();
    let mut signal = consumer(&registry, &mock, 500);
    let channel = signal.channel().unwrap().clone();

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let pump = channel.attach_feed(rx);
    tx.send(HardwareEvent::Command("POWER".into())).await.unwrap();
    tx.send(HardwareEvent::Payload(vec![7, 7])).await.unwrap();
    drop(tx);
    pump.await.unwrap();

    let events = drain(&mut signal);
    assert_eq!(commands(&events), vec!["POWER"]);
    assert_eq!(payloads(&events), vec![vec![7, 7]]);
}
