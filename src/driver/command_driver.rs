use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{
    Attached, ChannelRegistry, Configured, Signal, SignalEvent, Transceiver, Transmission,
};
use crate::command::{
    CommandId, CommandResolver, LabelLookup, ListOrder, ReferenceOrder, SuffixToggle, ToggleRule,
};
use crate::config::DriverConfig;

use super::device::Device;
use super::error::DriverError;
use super::event::DriverEvent;

type DeviceMap = Arc<RwLock<HashMap<String, Device>>>;

/// One device family on one shared channel
pub struct CommandDriver {
    config: DriverConfig,
    signal: Signal<Attached>,
    resolver: Arc<CommandResolver>,
    toggle: Option<Arc<dyn ToggleRule>>,
    devices: DeviceMap,
}

impl CommandDriver {
    /// Build the resolver and attach the signal described by `config`
    pub fn from_config(
        config: DriverConfig,
        registry: &ChannelRegistry,
        transceiver: Arc<dyn Transceiver>,
        labels: impl LabelLookup + 'static,
    ) -> Self {
        let toggle: Option<Arc<dyn ToggleRule>> = if config.emulates_toggle_bits() {
            Some(Arc::new(SuffixToggle::default()))
        } else {
            None
        };

        let mut builder = CommandResolver::builder(config.id.clone(), config.signal.cmds.clone())
            .labels(labels);
        builder = if config.signal.cmd_order.is_empty() {
            builder.ordering(ListOrder)
        } else {
            builder.ordering(ReferenceOrder::new(config.signal.cmd_order.clone()))
        };
        if let Some(rule) = &toggle {
            builder = builder.toggle_rule(Arc::clone(rule));
        }
        let resolver = Arc::new(builder.build());

        let signal = Signal::<Configured>::create(
            &config.id,
            config.signal.id.clone(),
            config.signal_settings(),
        )
        .attach(registry, transceiver);
        info!(
            "Driver {} attached to signal {} (toggle bits: {})",
            config.id,
            config.signal.id,
            toggle.is_some()
        );

        Self {
            config,
            signal,
            resolver,
            toggle,
            devices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn resolver(&self) -> &Arc<CommandResolver> {
        &self.resolver
    }

    pub fn signal(&self) -> &Signal<Attached> {
        &self.signal
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.devices.read().get(id).cloned()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Add a device and hold the radio for it.
    ///
    /// Devices without a type fall back to the driver's configured defaults.
    /// The device is dropped again when the radio cannot be registered.
    pub async fn add_device(&self, mut device: Device) -> Result<(), DriverError> {
        if device.cmd_type.is_none() {
            device.cmd_type = self.config.cmd_type.clone();
        }
        if device.cmd_sub_type.is_none() {
            device.cmd_sub_type = self.config.cmd_sub_type.clone();
        }

        let id = device.id.clone();
        info!("Driver {}: adding device {} ({:?})", self.config.id, id, device.cmd_type);
        let replaced = self.devices.write().insert(id.clone(), device);

        if let Err(e) = self.signal.register().await {
            error!("Driver {}: could not register device {}: {}", self.config.id, id, e);
            if replaced.is_none() {
                self.devices.write().remove(&id);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove a device; the radio is released with the last one
    pub fn delete_device(&self, id: &str) -> Result<Option<Device>, DriverError> {
        let (removed, remaining) = {
            let mut devices = self.devices.write();
            let removed = devices.remove(id);
            (removed, devices.len())
        };

        if removed.is_some() {
            info!("Driver {}: deleted device {}", self.config.id, id);
            if remaining == 0 {
                self.signal.unregister()?;
            }
        }
        Ok(removed)
    }

    /// Send `cmd` as understood by the device `device_id`
    pub async fn send_cmd(&self, device_id: &str, cmd: &str) -> Result<(), DriverError> {
        let device = self
            .device(device_id)
            .ok_or_else(|| DriverError::UnknownDevice(device_id.to_owned()))?;
        let requested = CommandId::parse(cmd)?;
        let descriptor = self.resolver.descriptor_for(
            device.cmd_type.as_deref(),
            device.cmd_sub_type.as_deref(),
            requested.cmd(),
        )?;

        let id = match &self.toggle {
            Some(rule) => rule.decorate(descriptor.command_id(), self.signal.next_toggle()?),
            None => descriptor.id().to_owned(),
        };
        debug!("Driver {}: {} -> {}", self.config.id, cmd, id);
        self.signal.send_command(&id).await?;
        Ok(())
    }

    /// Key in a number digit by digit using the numeric key commands
    pub async fn send_number(&self, device_id: &str, number: u64) -> Result<(), DriverError> {
        for digit in number.to_string().chars() {
            let cmd = format!("{}{}", self.config.signal.options.cmd_number_prefix, digit);
            self.send_cmd(device_id, &cmd).await?;
        }
        Ok(())
    }

    /// Start translating signal events into driver events on `output`.
    ///
    /// Runs until `shutdown` is cancelled, the signal closes or `output` is
    /// dropped. Can be started once per driver.
    pub fn spawn(
        &mut self,
        output: mpsc::Sender<DriverEvent>,
        shutdown: CancellationToken,
    ) -> Result<JoinHandle<()>, DriverError> {
        let events = self
            .signal
            .take_events()
            .ok_or_else(|| DriverError::AlreadyRunning(self.config.id.clone()))?;

        let event_loop = EventLoop {
            driver_id: self.config.id.clone(),
            resolver: Arc::clone(&self.resolver),
            toggle: self.toggle.clone(),
            devices: Arc::clone(&self.devices),
        };
        info!("Driver {}: starting event loop", self.config.id);
        Ok(tokio::spawn(event_loop.run(events, output, shutdown)))
    }

    /// Leave the channel for good
    pub fn shutdown(self) {
        info!("Driver {}: shutting down", self.config.id);
        let _detached = self.signal.detach();
    }
}

struct EventLoop {
    driver_id: String,
    resolver: Arc<CommandResolver>,
    toggle: Option<Arc<dyn ToggleRule>>,
    devices: DeviceMap,
}

impl EventLoop {
    async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<SignalEvent>,
        output: mpsc::Sender<DriverEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            select! {
                _ = shutdown.cancelled() => {
                    info!("Driver {}: event loop cancelled", self.driver_id);
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Driver {}: signal closed", self.driver_id);
                        break;
                    };
                    for translated in self.translate(event) {
                        if output.send(translated).await.is_err() {
                            warn!("Driver {}: event receiver dropped", self.driver_id);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Inbound id without any toggle marker, parsed
    fn parse_inbound(&self, raw: &str) -> Option<CommandId> {
        let stripped = match &self.toggle {
            Some(rule) => rule.strip(raw),
            None => raw.to_owned(),
        };
        match CommandId::parse(&stripped) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Driver {}: ignoring command: {}", self.driver_id, e);
                None
            }
        }
    }

    fn matching_devices(&self, command: &CommandId) -> Vec<String> {
        let devices = self.devices.read();
        self.resolver
            .devices_by_cmd(command, devices.values())
            .into_iter()
            .map(|device| device.id.clone())
            .collect()
    }

    fn translate(&self, event: SignalEvent) -> Vec<DriverEvent> {
        match event {
            SignalEvent::Command { id, received_at } => {
                let Some(command) = self.parse_inbound(&id) else {
                    return Vec::new();
                };
                let descriptor = self.resolver.resolve(&command);
                let device_ids = self.matching_devices(&command);
                if device_ids.is_empty() {
                    debug!("Driver {}: no device for {}", self.driver_id, command);
                }
                device_ids
                    .into_iter()
                    .map(|device_id| DriverEvent::DeviceCommand {
                        device_id,
                        command: command.clone(),
                        descriptor: descriptor.clone(),
                        received_at,
                    })
                    .collect()
            }
            SignalEvent::Payload {
                payload,
                received_at,
            } => vec![DriverEvent::Payload {
                payload,
                received_at,
            }],
            SignalEvent::Transmitted {
                transmission: Transmission::Command(id),
                sent_at,
            } => self
                .parse_inbound(&id)
                .map(|command| {
                    let device_ids = self.matching_devices(&command);
                    DriverEvent::CommandSent {
                        command,
                        device_ids,
                        sent_at,
                    }
                })
                .into_iter()
                .collect(),
            SignalEvent::Transmitted {
                transmission: Transmission::Payload(payload),
                sent_at,
            } => vec![DriverEvent::PayloadSent { payload, sent_at }],
            SignalEvent::Error { error, at } => vec![DriverEvent::SignalError { error, at }],
        }
    }
}
