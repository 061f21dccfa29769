//! Partition rules as data.
//!
//! Every decision the planner makes about a shared module comes from a
//! [`PartitionRule`]: which sharing domain it applies to, which modules it
//! accepts, where accepted modules go, and how many distinct entries must
//! use a module first. A single [`RuleMatcher`] evaluates them in priority
//! order. The same records are exported as cache-group JSON for the host
//! bundler.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::core::{ConfigError, EntrySet, ScopeId};
use crate::partition::SplitOptions;

/// Priority of vendor rules; higher is tried first.
pub const VENDOR_PRIORITY: i32 = 20;

/// Priority of commons rules.
pub const COMMONS_PRIORITY: i32 = 10;

/// A set of entries that may share code with each other.
///
/// All non-independent scopes form one shared domain; every independent
/// scope is a domain of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingDomain {
    Shared,
    Independent(ScopeId),
}

impl fmt::Display for SharingDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingDomain::Shared => write!(f, "shared"),
            SharingDomain::Independent(scope) => write!(f, "independent#{}", scope.0),
        }
    }
}

/// Module predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleTest {
    /// Source path matches the vendor regex
    Vendor { pattern: String },
    /// Every module
    Any,
}

/// Where a matched module goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BundleTarget {
    /// A fixed bundle name
    Fixed { name: String },
    /// `<scope>/<base>` when every user sits in one sub-package, else
    /// `<base>`; see [`crate::partition::plan`] for the tie-break
    ScopeLocal { base: String },
}

/// What kind of shared bundle a rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingClass {
    Runtime,
    Vendor,
    Commons,
    /// Inlined in the consuming entry bundle
    None,
}

impl fmt::Display for SharingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingClass::Runtime => write!(f, "runtime"),
            SharingClass::Vendor => write!(f, "vendor"),
            SharingClass::Commons => write!(f, "commons"),
            SharingClass::None => write!(f, "none"),
        }
    }
}

/// One partition rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionRule {
    /// Rule name, unique among the rules of one build
    pub name: String,

    /// Domain the rule applies to
    pub domain: SharingDomain,

    /// Module predicate
    pub test: ModuleTest,

    /// Destination bundle
    pub target: BundleTarget,

    /// Class of the destination bundle
    pub class: SharingClass,

    /// Minimum number of distinct using entries within the domain
    pub min_entries: usize,

    /// Higher priorities are tried first
    pub priority: i32,
}

/// The default rule set: vendor and commons for the shared domain, plus a
/// private vendor and commons pair for every independent scope.
pub fn default_rules(entries: &EntrySet, options: &SplitOptions) -> Vec<PartitionRule> {
    let vendor_test = ModuleTest::Vendor {
        pattern: options.vendor_test.clone(),
    };

    let mut rules = vec![
        PartitionRule {
            name: options.vendor_name.clone(),
            domain: SharingDomain::Shared,
            test: vendor_test.clone(),
            target: BundleTarget::Fixed {
                name: options.vendor_name.clone(),
            },
            class: SharingClass::Vendor,
            min_entries: options.min_shared_entries,
            priority: VENDOR_PRIORITY,
        },
        PartitionRule {
            name: options.commons_name.clone(),
            domain: SharingDomain::Shared,
            test: ModuleTest::Any,
            target: BundleTarget::ScopeLocal {
                base: options.commons_name.clone(),
            },
            class: SharingClass::Commons,
            min_entries: options.min_shared_entries,
            priority: COMMONS_PRIORITY,
        },
    ];

    for (id, scope) in entries.scopes().filter(|(_, s)| s.independent) {
        let vendor = scope.qualify(&options.vendor_name);
        let commons = scope.qualify(&options.commons_name);
        rules.push(PartitionRule {
            name: vendor.clone(),
            domain: SharingDomain::Independent(id),
            test: vendor_test.clone(),
            target: BundleTarget::Fixed { name: vendor },
            class: SharingClass::Vendor,
            min_entries: options.min_shared_entries,
            priority: VENDOR_PRIORITY,
        });
        rules.push(PartitionRule {
            name: commons.clone(),
            domain: SharingDomain::Independent(id),
            test: ModuleTest::Any,
            target: BundleTarget::Fixed { name: commons },
            class: SharingClass::Commons,
            min_entries: options.min_shared_entries,
            priority: COMMONS_PRIORITY,
        });
    }

    rules
}

/// Evaluates rules against modules.
#[derive(Debug)]
pub struct RuleMatcher {
    /// Rules sorted by descending priority, each with its compiled test
    rules: Vec<(PartitionRule, Option<Regex>)>,
}

impl RuleMatcher {
    /// Compile the rules' predicates.
    pub fn new(mut rules: Vec<PartitionRule>) -> Result<Self, ConfigError> {
        // Stable sort keeps declaration order among equal priorities
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        let compiled = rules
            .into_iter()
            .map(|rule| {
                let regex = match &rule.test {
                    ModuleTest::Vendor { pattern } => Some(compile_vendor_test(pattern)?),
                    ModuleTest::Any => None,
                };
                Ok((rule, regex))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(RuleMatcher { rules: compiled })
    }

    /// The first rule of `domain` that accepts a module with the given
    /// source path used by `users` distinct entries.
    pub fn select(
        &self,
        domain: SharingDomain,
        source: &str,
        users: usize,
    ) -> Option<&PartitionRule> {
        self.rules
            .iter()
            .filter(|(rule, _)| rule.domain == domain && users >= rule.min_entries)
            .find(|(_, regex)| regex.as_ref().map_or(true, |r| r.is_match(source)))
            .map(|(rule, _)| rule)
    }

    pub fn rules(&self) -> impl Iterator<Item = &PartitionRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }
}

/// Compile the vendor regex, reporting failures as configuration errors.
pub fn compile_vendor_test(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidVendorTest {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A rule in the host bundler's cache-group vocabulary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheGroup {
    name: Option<String>,
    scope_local: Option<String>,
    test: Option<String>,
    chunks: &'static str,
    min_chunks: usize,
    priority: i32,
    domain: String,
}

/// Rules plus runtime bundle names, as exported for the host bundler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExport {
    /// Scope root ("" for the shared domain) -> runtime bundle name
    runtime_chunks: BTreeMap<String, String>,
    cache_groups: BTreeMap<String, CacheGroup>,
}

/// Export rules as cache-group JSON.
pub fn export_rules(
    rules: &[PartitionRule],
    entries: &EntrySet,
    options: &SplitOptions,
) -> RuleExport {
    let mut runtime_chunks = BTreeMap::new();
    runtime_chunks.insert(String::new(), options.runtime_name.clone());
    for (_, scope) in entries.scopes().filter(|(_, s)| s.independent) {
        runtime_chunks.insert(scope.name.clone(), scope.qualify(&options.runtime_name));
    }

    let cache_groups = rules
        .iter()
        .map(|rule| {
            let (name, scope_local) = match &rule.target {
                BundleTarget::Fixed { name } => (Some(name.clone()), None),
                BundleTarget::ScopeLocal { base } => (None, Some(base.clone())),
            };
            let test = match &rule.test {
                ModuleTest::Vendor { pattern } => Some(pattern.clone()),
                ModuleTest::Any => None,
            };
            let domain = match rule.domain {
                SharingDomain::Shared => "shared".to_string(),
                SharingDomain::Independent(id) => entries.scope(id).name.clone(),
            };
            let group = CacheGroup {
                name,
                scope_local,
                test,
                chunks: "all",
                min_chunks: rule.min_entries,
                priority: rule.priority,
                domain,
            };
            (rule.name.clone(), group)
        })
        .collect();

    RuleExport {
        runtime_chunks,
        cache_groups,
    }
}
