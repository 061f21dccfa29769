//! The Partition Plan: which bundle each module lives in and which shared
//! bundles each entry must load.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::ScopeId;
use crate::partition::rules::{SharingClass, SharingDomain};

/// One planned output bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBundle {
    /// Bundle name (output path without extension)
    pub name: String,

    /// Owning scope
    pub scope: ScopeId,

    /// Sharing domain the bundle serves
    pub domain: SharingDomain,

    /// Sharing class; `None` marks an entry bundle holding inlined modules
    pub class: SharingClass,

    /// Modules placed in the bundle
    pub modules: BTreeSet<String>,
}

/// Result of partitioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionPlan {
    /// Bundle name -> bundle
    pub bundles: BTreeMap<String, PlannedBundle>,

    /// Entry output name -> shared bundles to load, runtime first, then
    /// vendor, then commons
    pub links: BTreeMap<String, Vec<String>>,
}

impl PartitionPlan {
    pub fn bundle(&self, name: &str) -> Option<&PlannedBundle> {
        self.bundles.get(name)
    }

    /// Shared bundles an entry loads, in load order.
    pub fn links_for(&self, entry_output: &str) -> &[String] {
        self.links
            .get(entry_output)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Runtime, vendor and commons bundles.
    pub fn shared_bundles(&self) -> impl Iterator<Item = &PlannedBundle> {
        self.bundles
            .values()
            .filter(|b| b.class != SharingClass::None)
    }

    /// Every bundle holding a module.
    pub fn bundles_containing(&self, module: &str) -> Vec<&PlannedBundle> {
        self.bundles
            .values()
            .filter(|b| b.modules.contains(module))
            .collect()
    }

    /// Get or create a bundle.
    pub(crate) fn bundle_mut(
        &mut self,
        name: &str,
        scope: ScopeId,
        domain: SharingDomain,
        class: SharingClass,
    ) -> &mut PlannedBundle {
        self.bundles
            .entry(name.to_string())
            .or_insert_with(|| PlannedBundle {
                name: name.to_string(),
                scope,
                domain,
                class,
                modules: BTreeSet::new(),
            })
    }

    /// Record that an entry loads a shared bundle.
    pub(crate) fn link(&mut self, entry_output: &str, bundle: &str) {
        let links = self.links.entry(entry_output.to_string()).or_default();
        if !links.iter().any(|l| l == bundle) {
            links.push(bundle.to_string());
        }
    }

    /// Put every entry's links in load order.
    pub(crate) fn sort_links(&mut self) {
        let rank = |name: &String| {
            self.bundles
                .get(name)
                .map(|b| b.class)
                .unwrap_or(SharingClass::None)
        };
        let mut sorted = BTreeMap::new();
        for (entry, links) in &self.links {
            let mut links = links.clone();
            links.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
            sorted.insert(entry.clone(), links);
        }
        self.links = sorted;
    }
}
