use serde::{Deserialize, Serialize};

use crate::command::CommandTarget;

/// A configured device model instance addressed by a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub cmd_type: Option<String>,
    #[serde(default)]
    pub cmd_sub_type: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cmd_type: None,
            cmd_sub_type: None,
        }
    }

    pub fn with_type(mut self, cmd_type: impl Into<String>) -> Self {
        self.cmd_type = Some(cmd_type.into());
        self
    }

    pub fn with_sub_type(mut self, cmd_sub_type: impl Into<String>) -> Self {
        self.cmd_sub_type = Some(cmd_sub_type.into());
        self
    }
}

impl CommandTarget for Device {
    fn cmd_type(&self) -> Option<&str> {
        self.cmd_type.as_deref()
    }

    fn cmd_sub_type(&self) -> Option<&str> {
        self.cmd_sub_type.as_deref()
    }
}
