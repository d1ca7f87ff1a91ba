//! Ordering strategies for a family's command list.
//!
//! The table is built in the order these produce. Sorting is stable, so
//! commands the strategy considers equal keep their list order.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::id::CommandId;

pub trait CommandOrdering: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Keep the list as given
#[derive(Debug, Default, Clone, Copy)]
pub struct ListOrder;

impl CommandOrdering for ListOrder {
    fn compare(&self, _a: &str, _b: &str) -> Ordering {
        Ordering::Equal
    }
}

/// Order by position of the bare command in a reference list.
///
/// Qualifiers are ignored, so `tv$~POWER_ON` ranks with `POWER_ON`. Commands
/// missing from the reference list go last.
#[derive(Debug, Clone, Default)]
pub struct ReferenceOrder {
    ranks: HashMap<String, usize>,
}

impl ReferenceOrder {
    pub fn new<I, S>(reference: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (rank, cmd) in reference.into_iter().enumerate() {
            ranks.entry(cmd.into()).or_insert(rank);
        }
        Self { ranks }
    }

    fn rank(&self, raw: &str) -> Option<usize> {
        let bare = match CommandId::parse(raw) {
            Ok(id) => id.cmd().to_owned(),
            Err(_) => raw.to_owned(),
        };
        self.ranks.get(&bare).copied()
    }
}

impl CommandOrdering for ReferenceOrder {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Stable sort of `cmds` by `ordering`
pub fn sort_commands(cmds: &mut [String], ordering: &dyn CommandOrdering) {
    cmds.sort_by(|a, b| ordering.compare(a, b));
}
