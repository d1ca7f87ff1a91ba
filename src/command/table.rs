//! Immutable command index, partitioned by qualifier specificity

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use super::descriptor::CommandDescriptor;
use super::id::CommandId;
use super::label::{resolve_label, LabelLookup};
use super::ordering::{sort_commands, CommandOrdering};
use super::toggle::ToggleRule;

pub type Partition = HashMap<String, Arc<CommandDescriptor>>;

/// Everything needed to build a [`CommandTable`]
pub struct TableSource<'a> {
    pub family: &'a str,
    pub cmds: &'a [String],
    pub ordering: Option<&'a dyn CommandOrdering>,
    pub toggle: Option<&'a dyn ToggleRule>,
    pub labels: &'a dyn LabelLookup,
}

#[derive(Debug, Default)]
pub struct CommandTable {
    global: Partition,
    by_sub_type: HashMap<String, Partition>,
    by_type: HashMap<String, Partition>,
    by_type_and_sub_type: HashMap<(String, String), Partition>,
    ordered: Vec<Arc<CommandDescriptor>>,
    raw_ids: HashSet<String>,
}

impl CommandTable {
    pub fn build(source: TableSource<'_>) -> Self {
        let mut cmds: Vec<String> = match source.toggle {
            Some(rule) => source
                .cmds
                .iter()
                .filter(|cmd| !rule.is_variant(cmd))
                .cloned()
                .collect(),
            None => source.cmds.to_vec(),
        };
        if let Some(ordering) = source.ordering {
            sort_commands(&mut cmds, ordering);
        }

        let mut table = Self::default();
        let mut missing = Vec::new();

        for raw in &cmds {
            let id = match CommandId::parse(raw) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Skipping command: {}", e);
                    continue;
                }
            };

            let label = resolve_label(source.labels, source.family, &id);
            if label.is_missing() {
                missing.push(id.id().to_owned());
            }
            let position = table.ordered.len();
            table.insert(Arc::new(CommandDescriptor::new(id, label, position)));
        }

        if !missing.is_empty() {
            info!(
                "Missing labels for {} commands of {}: {}",
                missing.len(),
                source.family,
                missing.join(", ")
            );
        }
        table
    }

    fn insert(&mut self, descriptor: Arc<CommandDescriptor>) {
        let cmd = descriptor.cmd().to_owned();
        let partition = match (descriptor.cmd_type(), descriptor.sub_type()) {
            (Some(cmd_type), Some(sub_type)) => self
                .by_type_and_sub_type
                .entry((cmd_type.to_owned(), sub_type.to_owned()))
                .or_default(),
            (Some(cmd_type), None) => self.by_type.entry(cmd_type.to_owned()).or_default(),
            (None, Some(sub_type)) => self.by_sub_type.entry(sub_type.to_owned()).or_default(),
            (None, None) => &mut self.global,
        };
        partition.insert(cmd, Arc::clone(&descriptor));

        self.raw_ids.insert(descriptor.id().to_owned());
        self.ordered.push(descriptor);
    }

    pub fn global(&self) -> &Partition {
        &self.global
    }

    pub fn sub_type_partition(&self, sub_type: &str) -> Option<&Partition> {
        self.by_sub_type.get(sub_type)
    }

    pub fn type_partition(&self, cmd_type: &str) -> Option<&Partition> {
        self.by_type.get(cmd_type)
    }

    pub fn type_and_sub_type_partition(&self, cmd_type: &str, sub_type: &str) -> Option<&Partition> {
        self.by_type_and_sub_type
            .get(&(cmd_type.to_owned(), sub_type.to_owned()))
    }

    /// Descriptors in command list order
    pub fn descriptors(&self) -> &[Arc<CommandDescriptor>] {
        &self.ordered
    }

    /// Whether the exact raw id is part of the list
    pub fn contains_raw(&self, id: &str) -> bool {
        self.raw_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::label::NoLabels;
    use crate::command::ordering::ReferenceOrder;
    use crate::command::toggle::SuffixToggle;

    fn cmds(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|cmd| cmd.to_string()).collect()
    }

    #[test]
    fn partitions_by_specificity() {
        let list = cmds(&["POWER", "tv$~POWER", "MUTE~$bar", "tv$~INPUT~$hdmi", "$~BROKEN"]);
        let table = CommandTable::build(TableSource {
            family: "ir",
            cmds: &list,
            ordering: None,
            toggle: None,
            labels: &NoLabels,
        });

        assert_eq!(table.len(), 4);
        assert!(table.global().contains_key("POWER"));
        assert_eq!(table.type_partition("tv").map(|p| p.len()), Some(1));
        assert!(table.sub_type_partition("bar").is_some());
        assert!(table
            .type_and_sub_type_partition("tv", "hdmi")
            .is_some_and(|p| p.contains_key("INPUT")));
        assert!(table.contains_raw("tv$~POWER"));
        assert!(!table.contains_raw("$~BROKEN"));
    }

    #[test]
    fn drops_toggle_variants_and_orders() {
        let list = cmds(&["VOLUME_UP", "VOLUME_UP_1_", "POWER"]);
        let ordering = ReferenceOrder::new(["POWER", "VOLUME_UP"]);
        let toggle = SuffixToggle::default();
        let table = CommandTable::build(TableSource {
            family: "ir",
            cmds: &list,
            ordering: Some(&ordering),
            toggle: Some(&toggle),
            labels: &NoLabels,
        });

        let order: Vec<&str> = table.descriptors().iter().map(|d| d.id()).collect();
        assert_eq!(order, vec!["POWER", "VOLUME_UP"]);
        assert_eq!(table.descriptors()[1].position(), 1);
    }
}
