//! Device-scoped command lookups on top of a [`CommandTable`]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::descriptor::CommandDescriptor;
use super::error::CommandError;
use super::id::{qualifier, CommandId};
use super::label::{LabelLookup, NoLabels};
use super::ordering::CommandOrdering;
use super::table::{CommandTable, Partition, TableSource};
use super::toggle::ToggleRule;

/// Something addressed by commands: a configured device
pub trait CommandTarget {
    fn cmd_type(&self) -> Option<&str>;
    fn cmd_sub_type(&self) -> Option<&str>;
}

/// Normalized (type, subtype) pair; `default` and empty count as none
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    cmd_type: Option<String>,
    sub_type: Option<String>,
}

impl TypeKey {
    pub fn new(cmd_type: Option<&str>, sub_type: Option<&str>) -> Self {
        Self {
            cmd_type: qualifier(cmd_type).map(str::to_owned),
            sub_type: qualifier(sub_type).map(str::to_owned),
        }
    }

    pub fn cmd_type(&self) -> Option<&str> {
        self.cmd_type.as_deref()
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.sub_type.as_deref()
    }
}

/// Merged command map for one (type, subtype) pair
#[derive(Debug, Default)]
pub struct DeviceCommands {
    by_cmd: HashMap<String, Arc<CommandDescriptor>>,
}

impl DeviceCommands {
    fn merge(&mut self, partition: Option<&Partition>) {
        if let Some(partition) = partition {
            self.by_cmd.extend(
                partition
                    .iter()
                    .map(|(cmd, descriptor)| (cmd.clone(), Arc::clone(descriptor))),
            );
        }
    }

    pub fn get(&self, cmd: &str) -> Option<&Arc<CommandDescriptor>> {
        self.by_cmd.get(cmd)
    }

    pub fn contains(&self, cmd: &str) -> bool {
        self.by_cmd.contains_key(cmd)
    }

    pub fn len(&self) -> usize {
        self.by_cmd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cmd.is_empty()
    }

    /// Descriptors in command list order
    pub fn ordered(&self) -> Vec<&Arc<CommandDescriptor>> {
        let mut descriptors: Vec<_> = self.by_cmd.values().collect();
        descriptors.sort_by_key(|descriptor| descriptor.position());
        descriptors
    }
}

pub struct CommandResolverBuilder {
    family: String,
    cmds: Vec<String>,
    ordering: Option<Box<dyn CommandOrdering>>,
    toggle: Option<Arc<dyn ToggleRule>>,
    labels: Box<dyn LabelLookup>,
}

impl CommandResolverBuilder {
    pub fn ordering(mut self, ordering: impl CommandOrdering + 'static) -> Self {
        self.ordering = Some(Box::new(ordering));
        self
    }

    /// Drop the rule's variant entries from the list
    pub fn toggle_rule(mut self, rule: Arc<dyn ToggleRule>) -> Self {
        self.toggle = Some(rule);
        self
    }

    pub fn labels(mut self, labels: impl LabelLookup + 'static) -> Self {
        self.labels = Box::new(labels);
        self
    }

    pub fn build(self) -> CommandResolver {
        let table = CommandTable::build(TableSource {
            family: &self.family,
            cmds: &self.cmds,
            ordering: self.ordering.as_deref(),
            toggle: self.toggle.as_deref(),
            labels: &*self.labels,
        });
        info!(
            "Built command table for {} with {} commands",
            self.family,
            table.len()
        );

        CommandResolver {
            family: self.family,
            table,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

/// Answers command lookups for one device family
pub struct CommandResolver {
    family: String,
    table: CommandTable,
    cache: Mutex<HashMap<TypeKey, Arc<DeviceCommands>>>,
}

impl fmt::Debug for CommandResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandResolver")
            .field("family", &self.family)
            .field("commands", &self.table.len())
            .finish_non_exhaustive()
    }
}

impl CommandResolver {
    pub fn builder(family: impl Into<String>, cmds: Vec<String>) -> CommandResolverBuilder {
        CommandResolverBuilder {
            family: family.into(),
            cmds,
            ordering: None,
            toggle: None,
            labels: Box::new(NoLabels),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Commands available to a device of the given type and subtype.
    ///
    /// Partitions are merged from least to most specific, so a qualified
    /// command shadows the global one with the same bare name. The result is
    /// memoized; repeated calls return the same `Arc`.
    pub fn cmds_for_device(&self, cmd_type: Option<&str>, sub_type: Option<&str>) -> Arc<DeviceCommands> {
        let key = TypeKey::new(cmd_type, sub_type);
        let mut cache = self.cache.lock();
        if let Some(commands) = cache.get(&key) {
            return Arc::clone(commands);
        }

        let mut commands = DeviceCommands::default();
        commands.merge(Some(self.table.global()));
        if let Some(sub_type) = key.sub_type() {
            commands.merge(self.table.sub_type_partition(sub_type));
        }
        if let Some(cmd_type) = key.cmd_type() {
            commands.merge(self.table.type_partition(cmd_type));
            if let Some(sub_type) = key.sub_type() {
                commands.merge(self.table.type_and_sub_type_partition(cmd_type, sub_type));
            }
        }
        debug!(
            "Cached {} commands for type {:?} subtype {:?}",
            commands.len(),
            key.cmd_type(),
            key.sub_type()
        );

        let commands = Arc::new(commands);
        cache.insert(key, Arc::clone(&commands));
        commands
    }

    /// Descriptor for `cmd` as seen by a device of the given type and subtype
    pub fn descriptor_for(
        &self,
        cmd_type: Option<&str>,
        sub_type: Option<&str>,
        cmd: &str,
    ) -> Result<Arc<CommandDescriptor>, CommandError> {
        self.cmds_for_device(cmd_type, sub_type)
            .get(cmd)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand {
                cmd: cmd.to_owned(),
                cmd_type: qualifier(cmd_type).map(str::to_owned),
                sub_type: qualifier(sub_type).map(str::to_owned),
            })
    }

    /// Most specific descriptor for a parsed id
    pub fn resolve(&self, id: &CommandId) -> Option<Arc<CommandDescriptor>> {
        let cmd = id.cmd();
        let candidates = [
            id.cmd_type()
                .zip(id.sub_type())
                .and_then(|(t, s)| self.table.type_and_sub_type_partition(t, s)),
            id.cmd_type().and_then(|t| self.table.type_partition(t)),
            id.sub_type().and_then(|s| self.table.sub_type_partition(s)),
            Some(self.table.global()),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|partition| partition.get(cmd))
            .cloned()
    }

    /// Devices an inbound command is meant for.
    ///
    /// A qualified command only reaches devices with the same qualifier. A
    /// missing qualifier skips devices whose own qualifier, added to the
    /// incoming id, names another command of the list.
    pub fn devices_by_cmd<'a, D: CommandTarget>(
        &self,
        id: &CommandId,
        devices: impl IntoIterator<Item = &'a D>,
    ) -> Vec<&'a D>
    where
        D: 'a,
    {
        devices
            .into_iter()
            .filter(|device| {
                let device_type = qualifier(device.cmd_type());
                let device_sub_type = qualifier(device.cmd_sub_type());

                let type_ok = match id.cmd_type() {
                    Some(cmd_type) => device_type == Some(cmd_type),
                    None => device_type.map_or(true, |device_type| {
                        !self
                            .table
                            .contains_raw(&CommandId::compose(Some(device_type), id.cmd(), id.sub_type()))
                    }),
                };
                let sub_type_ok = match id.sub_type() {
                    Some(sub_type) => device_sub_type == Some(sub_type),
                    None => device_sub_type.map_or(true, |device_sub_type| {
                        !self
                            .table
                            .contains_raw(&CommandId::compose(id.cmd_type(), id.cmd(), Some(device_sub_type)))
                    }),
                };
                type_ok && sub_type_ok
            })
            .collect()
    }
}
