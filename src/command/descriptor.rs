use super::id::CommandId;
use super::label::CommandLabel;

/// A parsed command id with its display label and list position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    id: CommandId,
    label: CommandLabel,
    position: usize,
}

impl CommandDescriptor {
    pub fn new(id: CommandId, label: CommandLabel, position: usize) -> Self {
        Self { id, label, position }
    }

    pub fn command_id(&self) -> &CommandId {
        &self.id
    }

    /// Raw id as listed, e.g. `tv$~POWER_ON`
    pub fn id(&self) -> &str {
        self.id.id()
    }

    pub fn cmd(&self) -> &str {
        self.id.cmd()
    }

    pub fn cmd_type(&self) -> Option<&str> {
        self.id.cmd_type()
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.id.sub_type()
    }

    pub fn label(&self) -> &CommandLabel {
        &self.label
    }

    /// Index in the ordered command list
    pub fn position(&self) -> usize {
        self.position
    }
}
