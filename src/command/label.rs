//! Display labels for commands, looked up through a translation seam

use std::collections::HashMap;
use std::fmt;

use super::id::CommandId;

/// Translation table the host application provides
pub trait LabelLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// No translations at all; every label ends up missing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLabels;

impl LabelLookup for NoLabels {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}

impl LabelLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLabel {
    Resolved(String),
    /// Nothing matched; carries the bare command as fallback text
    Missing(String),
}

impl CommandLabel {
    pub fn text(&self) -> &str {
        match self {
            Self::Resolved(text) | Self::Missing(text) => text,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

impl fmt::Display for CommandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Keys tried for `id`, most specific first
pub fn label_keys(family: &str, id: &CommandId) -> Vec<String> {
    let cmd = id.cmd();
    let mut keys = Vec::with_capacity(7);

    if let Some(cmd_type) = id.cmd_type() {
        if let Some(sub_type) = id.sub_type() {
            keys.push(format!("cmds.{cmd_type}.{cmd}.{sub_type}"));
        }
        keys.push(format!("cmds.{cmd_type}.{cmd}.default"));
        keys.push(format!("cmds.{cmd_type}.{cmd}"));
    }
    if let Some(sub_type) = id.sub_type() {
        keys.push(format!("cmds.{cmd}.{sub_type}"));
    }
    keys.push(format!("cmds.{cmd}.default"));
    keys.push(format!("cmds.{cmd}"));
    keys.push(format!("{family}_generator.button_labels.{cmd}"));
    keys
}

pub fn resolve_label(lookup: &dyn LabelLookup, family: &str, id: &CommandId) -> CommandLabel {
    label_keys(family, id)
        .iter()
        .find_map(|key| lookup.lookup(key))
        .map_or_else(
            || CommandLabel::Missing(id.cmd().to_owned()),
            CommandLabel::Resolved,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn key_chain_order() {
        let id = CommandId::parse("tv$~INPUT~$hdmi").unwrap();
        assert_eq!(
            label_keys("ir", &id),
            vec![
                "cmds.tv.INPUT.hdmi",
                "cmds.tv.INPUT.default",
                "cmds.tv.INPUT",
                "cmds.INPUT.hdmi",
                "cmds.INPUT.default",
                "cmds.INPUT",
                "ir_generator.button_labels.INPUT",
            ]
        );
    }

    #[test]
    fn most_specific_key_wins() {
        let labels = table(&[("cmds.POWER", "Power"), ("cmds.tv.POWER", "TV power")]);
        let typed = CommandId::parse("tv$~POWER").unwrap();
        let bare = CommandId::parse("POWER").unwrap();

        assert_eq!(
            resolve_label(&labels, "ir", &typed),
            CommandLabel::Resolved("TV power".into())
        );
        assert_eq!(
            resolve_label(&labels, "ir", &bare),
            CommandLabel::Resolved("Power".into())
        );
    }

    #[test]
    fn generator_fallback_then_missing() {
        let labels = table(&[("ir_generator.button_labels.MUTE", "Mute")]);
        let mute = CommandId::parse("MUTE").unwrap();
        let eject = CommandId::parse("EJECT").unwrap();

        assert_eq!(resolve_label(&labels, "ir", &mute).text(), "Mute");
        let missing = resolve_label(&NoLabels, "ir", &eject);
        assert!(missing.is_missing());
        assert_eq!(missing.text(), "EJECT");
    }
}
