//! Core data types for mpbundle.

pub mod entry;
pub mod entry_set;
pub mod manifest;
pub mod scope;
pub mod specifier;
pub mod usage;
pub mod workspace;

pub use entry::{EntryId, EntryKind, EntryRef, Origin};
pub use entry_set::EntrySet;
pub use manifest::{AppManifest, SubPackage, UsageDescriptor};
pub use scope::{Scope, ScopeId};
pub use specifier::{ComponentReference, SpecifierRules};
pub use usage::{ModuleUsage, UsageFacts};
pub use workspace::{AppWorkspace, ConfigError};
