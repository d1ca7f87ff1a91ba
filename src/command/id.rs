use std::fmt;
use std::str::FromStr;

use super::error::CommandError;

/// Separator after the device type qualifier
pub const TYPE_SEPARATOR: &str = "$~";
/// Separator before the device subtype qualifier
pub const SUB_TYPE_SEPARATOR: &str = "~$";

const DEFAULT_QUALIFIER: &str = "default";

/// Treat empty and `default` qualifiers as absent
pub fn qualifier(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty() && *value != DEFAULT_QUALIFIER)
}

/// Parsed command identifier of the form `[type$~]cmd[~$subType]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandId {
    id: String,
    cmd_type: Option<String>,
    sub_type: Option<String>,
    cmd: String,
}

impl CommandId {
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let malformed = |reason| CommandError::MalformedCommandId {
            id: raw.to_owned(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(malformed("empty id"));
        }

        let (cmd_type, rest) = match raw.split_once(TYPE_SEPARATOR) {
            Some(("", _)) => return Err(malformed("empty type before separator")),
            Some((cmd_type, rest)) => (Some(cmd_type), rest),
            None => (None, raw),
        };

        let (cmd, sub_type) = match rest.split_once(SUB_TYPE_SEPARATOR) {
            Some((_, "")) => return Err(malformed("empty subtype after separator")),
            Some((cmd, sub_type)) => (cmd, Some(sub_type)),
            None => (rest, None),
        };

        if cmd.is_empty() {
            return Err(malformed("empty command"));
        }

        let parts = [Some(cmd), cmd_type, sub_type];
        if parts.iter().flatten().any(|part| {
            part.contains(TYPE_SEPARATOR) || part.contains(SUB_TYPE_SEPARATOR)
        }) {
            return Err(malformed("repeated separator"));
        }

        Ok(Self {
            id: raw.to_owned(),
            cmd_type: cmd_type.map(str::to_owned),
            sub_type: sub_type.map(str::to_owned),
            cmd: cmd.to_owned(),
        })
    }

    /// Build the raw id string for the given parts
    pub fn compose(cmd_type: Option<&str>, cmd: &str, sub_type: Option<&str>) -> String {
        let mut id = String::new();
        if let Some(cmd_type) = cmd_type {
            id.push_str(cmd_type);
            id.push_str(TYPE_SEPARATOR);
        }
        id.push_str(cmd);
        if let Some(sub_type) = sub_type {
            id.push_str(SUB_TYPE_SEPARATOR);
            id.push_str(sub_type);
        }
        id
    }

    /// The full id as it appears in the command list
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// Type qualifier; `default` counts as none
    pub fn cmd_type(&self) -> Option<&str> {
        qualifier(self.cmd_type.as_deref())
    }

    /// Subtype qualifier; `default` counts as none
    pub fn sub_type(&self) -> Option<&str> {
        qualifier(self.sub_type.as_deref())
    }

    pub fn is_qualified(&self) -> bool {
        self.cmd_type().is_some() || self.sub_type().is_some()
    }

    /// Same command with `cmd` replaced, keeping both qualifiers
    pub fn with_cmd(&self, cmd: &str) -> Self {
        let id = Self::compose(self.cmd_type.as_deref(), cmd, self.sub_type.as_deref());
        Self {
            id,
            cmd_type: self.cmd_type.clone(),
            sub_type: self.sub_type.clone(),
            cmd: cmd.to_owned(),
        }
    }
}

impl FromStr for CommandId {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
