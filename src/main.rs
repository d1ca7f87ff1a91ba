use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use radiomux::channel::{ChannelRegistry, LoopbackTransceiver, Transceiver};
use radiomux::command::NoLabels;
use radiomux::config::DriverConfig;
use radiomux::driver::{CommandDriver, Device, DriverEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Fallback driver definition when no config file is found
const LG_TV: &str = r#"
id = "lg_tv"
cmd_type = "tv"

[signal]
id = "nec_lg"
type = "ir"
cmd_order = ["POWER_ON", "POWER_OFF", "VOLUME_UP", "VOLUME_DOWN", "MUTE_TOGGLE"]
cmds = [
    "tv$~POWER_ON",
    "tv$~POWER_OFF",
    "POWER_TOGGLE",
    "VOLUME_UP",
    "VOLUME_DOWN",
    "MUTE_TOGGLE",
    "tv$~INPUT_HDMI_1",
    "tv$~INPUT_HDMI_2",
    "number_0", "number_1", "number_2", "number_3", "number_4",
    "number_5", "number_6", "number_7", "number_8", "number_9",
]

[signal.options]
min_tx_interval_ms = 250
"#;

const DEMO_DEVICE: &str = "living-room";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config().await?;
    info!(
        "Driver {} on signal {} with {} commands",
        config.id,
        config.signal.id,
        config.signal.cmds.len()
    );

    let registry = ChannelRegistry::new();
    let (radio, feed) = LoopbackTransceiver::new();
    let radio: Arc<dyn Transceiver> = Arc::new(radio);

    let mut driver = CommandDriver::from_config(config, &registry, radio, NoLabels);
    let _feed_handle = driver
        .signal()
        .channel()
        .map_err(|e| eyre!("Driver has no channel: {}", e))?
        .attach_feed(feed);

    let (event_tx, mut event_rx) = mpsc::channel(100);
    let shutdown = CancellationToken::new();
    let loop_handle = driver
        .spawn(event_tx, shutdown.clone())
        .map_err(|e| eyre!("Failed to start driver: {}", e))?;

    driver.add_device(Device::new(DEMO_DEVICE)).await?;

    for cmd in ["POWER_ON", "VOLUME_UP", "VOLUME_UP", "MUTE_TOGGLE"] {
        if let Err(e) = driver.send_cmd(DEMO_DEVICE, cmd).await {
            warn!("Sending {} failed: {}", cmd, e);
        }
    }
    driver.send_number(DEMO_DEVICE, 42).await?;

    while let Ok(Some(event)) = tokio::time::timeout(DRAIN_TIMEOUT, event_rx.recv()).await {
        log_event(&event);
    }

    driver.delete_device(DEMO_DEVICE)?;
    shutdown.cancel();
    loop_handle.await?;
    driver.shutdown();

    info!("Demo finished");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// First CLI argument, else the user config dir, else the built-in LG TV
async fn load_config() -> Result<DriverConfig> {
    let candidate = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(DriverConfig::default_path);

    match candidate {
        Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
            Ok(DriverConfig::load(&path).await?)
        }
        Some(path) => {
            info!("No config at {}, using built-in LG TV", path.display());
            Ok(DriverConfig::from_toml_str(LG_TV)?)
        }
        None => Ok(DriverConfig::from_toml_str(LG_TV)?),
    }
}

fn log_event(event: &DriverEvent) {
    match event {
        DriverEvent::DeviceCommand {
            device_id,
            command,
            descriptor,
            received_at,
        } => info!(
            "[{}] {} received {} ({})",
            received_at.format("%H:%M:%S%.3f"),
            device_id,
            command,
            descriptor
                .as_ref()
                .map_or("unlisted", |descriptor| descriptor.label().text())
        ),
        DriverEvent::CommandSent {
            command,
            device_ids,
            sent_at,
        } => info!(
            "[{}] sent {} for {:?}",
            sent_at.format("%H:%M:%S%.3f"),
            command,
            device_ids
        ),
        DriverEvent::Payload { payload, .. } => info!("Payload received: {:?}", payload),
        DriverEvent::PayloadSent { payload, .. } => info!("Payload sent: {:?}", payload),
        DriverEvent::SignalError { error, .. } => warn!("Signal error: {}", error),
    }
}
