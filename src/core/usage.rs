//! Module usage facts reported by the host bundler after its graph build.
//!
//! The fact file is a JSON array:
//!
//! ```json
//! [{ "module": "utils/format", "source": "src/utils/format.js", "entries": ["pages/index"] }]
//! ```
//!
//! Entries are named by output name (falling back to entry id).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Usage of one source module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUsage {
    /// Module identifier as the host bundler names it
    pub module: String,

    /// Source path of the module (absolute or relative to the app root)
    #[serde(default)]
    pub source: String,

    /// Entries that transitively require the module
    #[serde(default)]
    pub entries: Vec<String>,
}

impl ModuleUsage {
    pub fn new(
        module: impl Into<String>,
        source: impl Into<String>,
        entries: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        ModuleUsage {
            module: module.into(),
            source: source.into(),
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// The finalized fact set for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageFacts {
    pub modules: Vec<ModuleUsage>,
}

impl UsageFacts {
    pub fn new(modules: Vec<ModuleUsage>) -> Self {
        UsageFacts { modules }
    }

    /// Load facts from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read usage facts: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("failed to parse usage facts: {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleUsage> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
