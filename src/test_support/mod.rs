//! Test utilities and mocks for mpbundle unit tests.
//!
//! [`MemoryUsageReader`] stands in for component descriptors on disk so
//! resolver tests can describe a component graph inline; the fixtures
//! module writes complete application trees into a temporary directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use mpbundle::test_support::MemoryUsageReader;
//!
//! let reader = MemoryUsageReader::new()
//!     .with_components("index", &["./comp1"])
//!     .with_components("sub/a", &["../../comp1"]);
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::manifest::UsingComponents;
use crate::core::{EntryRef, UsageDescriptor};
use crate::resolver::descriptor::UsageReader;
use crate::resolver::errors::DescriptorError;

// Re-export fixtures for convenience
pub use fixtures::*;

#[derive(Debug, Clone)]
enum MemoryDescriptor {
    Components(Vec<String>),
    Malformed(String),
}

/// In-memory descriptor source keyed by entry id.
///
/// Records every read so tests can check how often each entry was visited.
#[derive(Debug, Default)]
pub struct MemoryUsageReader {
    descriptors: HashMap<String, MemoryDescriptor>,
    reads: Mutex<Vec<String>>,
}

impl MemoryUsageReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the specifiers an entry's descriptor uses, in order.
    pub fn with_components(mut self, entry: &str, specifiers: &[&str]) -> Self {
        self.descriptors.insert(
            entry.to_string(),
            MemoryDescriptor::Components(specifiers.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    /// Make an entry's descriptor fail to parse.
    pub fn with_malformed(mut self, entry: &str, message: &str) -> Self {
        self.descriptors
            .insert(entry.to_string(), MemoryDescriptor::Malformed(message.to_string()));
        self
    }

    /// Entry ids read so far, in completion order.
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// How many times an entry's descriptor was read.
    pub fn read_count(&self, entry: &str) -> usize {
        self.reads().iter().filter(|r| r.as_str() == entry).count()
    }
}

impl UsageReader for MemoryUsageReader {
    fn read_usages(&self, entry: &EntryRef) -> Result<Option<UsageDescriptor>, DescriptorError> {
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(entry.id.to_string());
        }

        match self.descriptors.get(entry.id.as_str()) {
            None => Ok(None),
            Some(MemoryDescriptor::Malformed(message)) => Err(DescriptorError::Malformed {
                path: PathBuf::from(format!("{}.json", entry.id)),
                message: message.clone(),
            }),
            Some(MemoryDescriptor::Components(specs)) => {
                let pairs = specs
                    .iter()
                    .enumerate()
                    .map(|(i, spec)| (format!("c{}", i), spec.clone()))
                    .collect();
                Ok(Some(UsageDescriptor {
                    using_components: UsingComponents(pairs),
                }))
            }
        }
    }
}
