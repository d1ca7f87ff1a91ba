use std::fmt::Debug;

use super::id::CommandId;

/// Toggle-bit emulation for protocols that alternate two codes per button.
///
/// The command list carries both variants; the rule tells them apart, picks
/// the variant to send and maps received variants back to the base command.
pub trait ToggleRule: Send + Sync + Debug {
    /// Outgoing id for `id`, with the variant applied when `toggled`
    fn decorate(&self, id: &CommandId, toggled: bool) -> String;

    /// Inbound id with any variant marker removed
    fn strip(&self, raw: &str) -> String;

    /// Whether a command list entry is the alternate variant
    fn is_variant(&self, raw: &str) -> bool;
}

/// Variant marked by a suffix on the bare command, `_1_` by default
#[derive(Debug, Clone)]
pub struct SuffixToggle {
    marker: String,
}

impl Default for SuffixToggle {
    fn default() -> Self {
        Self::new("_1_")
    }
}

impl SuffixToggle {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl ToggleRule for SuffixToggle {
    fn decorate(&self, id: &CommandId, toggled: bool) -> String {
        if !toggled {
            return id.id().to_owned();
        }
        id.with_cmd(&format!("{}{}", id.cmd(), self.marker))
            .id()
            .to_owned()
    }

    fn strip(&self, raw: &str) -> String {
        match CommandId::parse(raw) {
            Ok(id) => match id.cmd().strip_suffix(self.marker.as_str()) {
                Some(base) if !base.is_empty() => id.with_cmd(base).id().to_owned(),
                _ => raw.to_owned(),
            },
            Err(_) => raw.replace(self.marker.as_str(), ""),
        }
    }

    fn is_variant(&self, raw: &str) -> bool {
        raw.contains(self.marker.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorate_only_when_toggled() {
        let rule = SuffixToggle::default();
        let id = CommandId::parse("tv$~VOLUME_UP~$lg").unwrap();
        assert_eq!(rule.decorate(&id, false), "tv$~VOLUME_UP~$lg");
        assert_eq!(rule.decorate(&id, true), "tv$~VOLUME_UP_1_~$lg");
    }

    #[test]
    fn strip_restores_base_command() {
        let rule = SuffixToggle::default();
        assert_eq!(rule.strip("tv$~VOLUME_UP_1_~$lg"), "tv$~VOLUME_UP~$lg");
        assert_eq!(rule.strip("MUTE_1_"), "MUTE");
        assert_eq!(rule.strip("MUTE"), "MUTE");
        assert!(rule.is_variant("MUTE_1_"));
        assert!(!rule.is_variant("MUTE"));
    }
}
