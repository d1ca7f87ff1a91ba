//! Command taxonomy
//!
//! A device family ships one flat command list. Each entry may be qualified by
//! device type and subtype:
//!
//! ```text
//! [type$~]cmd[~$subType]       e.g.  POWER_ON, tv$~POWER_ON, tv$~INPUT~$hdmi
//! ```
//!
//! The list is indexed once into an immutable [`CommandTable`] and queried
//! through a [`CommandResolver`], which caches the merged command map of each
//! (type, subtype) pair it has been asked about.

pub mod descriptor;
pub mod error;
pub mod id;
pub mod label;
pub mod ordering;
pub mod resolver;
pub mod table;
pub mod toggle;

pub use descriptor::CommandDescriptor;
pub use error::CommandError;
pub use id::{qualifier, CommandId, SUB_TYPE_SEPARATOR, TYPE_SEPARATOR};
pub use label::{CommandLabel, LabelLookup, NoLabels};
pub use ordering::{CommandOrdering, ListOrder, ReferenceOrder};
pub use resolver::{CommandResolver, CommandResolverBuilder, CommandTarget, DeviceCommands, TypeKey};
pub use table::CommandTable;
pub use toggle::{SuffixToggle, ToggleRule};
