//! Chunk partition planning.
//!
//! Given the resolved entries and the host bundler's finalized module usage
//! facts, decides which modules move into shared bundles (vendor, commons)
//! and which stay inlined in each consuming entry bundle, and which shared
//! bundles every entry has to load.
//!
//! Entries in an independent sub-package share nothing with any other
//! scope, so each independent scope is planned as its own sharing domain
//! with private vendor, commons and runtime bundles.

pub mod plan;
pub mod rules;

pub use plan::{PartitionPlan, PlannedBundle};
pub use rules::{PartitionRule, RuleMatcher, SharingClass, SharingDomain};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::entry::normalize;
use crate::core::{ConfigError, EntryRef, EntrySet, ModuleUsage, ScopeId, UsageFacts};
use crate::partition::rules::BundleTarget;
use crate::util::config::Config;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs::to_slash;

/// Planner settings from `[split]`.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub min_shared_entries: usize,
    pub vendor_test: String,
    pub commons_name: String,
    pub vendor_name: String,
    pub runtime_name: String,

    /// Relative module sources are resolved against this directory
    pub app_root: PathBuf,
}

impl SplitOptions {
    /// Read and validate the split settings.
    pub fn from_config(config: &Config, app_root: &Path) -> Result<Self, ConfigError> {
        rules::compile_vendor_test(config.vendor_test())?;
        Ok(SplitOptions {
            min_shared_entries: config.min_shared_entries(),
            vendor_test: config.vendor_test().to_string(),
            commons_name: config.commons_name().to_string(),
            vendor_name: config.vendor_name().to_string(),
            runtime_name: config.runtime_name().to_string(),
            app_root: app_root.to_path_buf(),
        })
    }

    /// Absolute source path, used for the vendor test.
    fn absolute_source(&self, source: &str) -> String {
        let path = Path::new(source);
        if path.is_absolute() {
            to_slash(path)
        } else {
            to_slash(&self.app_root.join(path))
        }
    }

    /// Source path relative to the app root, used for scope containment.
    fn app_relative_source(&self, source: &str) -> String {
        let path = Path::new(source);
        match path.strip_prefix(&self.app_root) {
            Ok(rel) => normalize(&to_slash(rel)),
            Err(_) if path.is_absolute() => String::new(),
            Err(_) => normalize(source),
        }
    }
}

/// Plan the partition with the default rule set.
pub fn plan(
    entries: &EntrySet,
    facts: &UsageFacts,
    options: &SplitOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<PartitionPlan, ConfigError> {
    let matcher = RuleMatcher::new(rules::default_rules(entries, options))?;
    Ok(plan_with(entries, facts, options, &matcher, diagnostics))
}

/// Plan the partition with an explicit matcher.
pub fn plan_with(
    entries: &EntrySet,
    facts: &UsageFacts,
    options: &SplitOptions,
    matcher: &RuleMatcher,
    diagnostics: &mut Vec<Diagnostic>,
) -> PartitionPlan {
    let mut plan = PartitionPlan::default();
    add_runtime_bundles(&mut plan, entries, options);

    let mut unknown: BTreeSet<String> = BTreeSet::new();
    for usage in facts.iter() {
        let users = using_entries(entries, usage, &mut unknown);
        for (domain, domain_users) in by_domain(entries, &users) {
            place_module(&mut plan, entries, options, matcher, usage, domain, &domain_users);
        }
    }

    for name in unknown {
        let diag = Diagnostic::warning(format!("usage facts name unknown entry `{}`", name))
            .with_context("the entry is ignored for partitioning")
            .with_suggestion(suggestions::UNKNOWN_ENTRY);
        tracing::warn!("{}", diag.message);
        diagnostics.push(diag);
    }

    plan.sort_links();

    tracing::info!(
        "planned {} shared bundle(s) for {} module(s)",
        plan.shared_bundles().filter(|b| !b.modules.is_empty()).count(),
        facts.len()
    );

    plan
}

/// The shared runtime plus one private runtime per independent scope. Every
/// entry loads the runtime of its domain.
fn add_runtime_bundles(plan: &mut PartitionPlan, entries: &EntrySet, options: &SplitOptions) {
    plan.bundle_mut(
        &options.runtime_name,
        ScopeId::ROOT,
        SharingDomain::Shared,
        SharingClass::Runtime,
    );
    for (id, scope) in entries.scopes().filter(|(_, s)| s.independent) {
        plan.bundle_mut(
            &scope.qualify(&options.runtime_name),
            id,
            SharingDomain::Independent(id),
            SharingClass::Runtime,
        );
    }

    for entry in entries.iter() {
        let runtime = match domain_of(entries, entry) {
            SharingDomain::Shared => options.runtime_name.clone(),
            SharingDomain::Independent(id) => entries.scope(id).qualify(&options.runtime_name),
        };
        plan.link(&entry.output, &runtime);
    }
}

fn domain_of(entries: &EntrySet, entry: &EntryRef) -> SharingDomain {
    if entries.scope(entry.scope).independent {
        SharingDomain::Independent(entry.scope)
    } else {
        SharingDomain::Shared
    }
}

/// Distinct known entries using a module, in entry-set order.
fn using_entries<'a>(
    entries: &'a EntrySet,
    usage: &ModuleUsage,
    unknown: &mut BTreeSet<String>,
) -> Vec<&'a EntryRef> {
    let mut seen = BTreeSet::new();
    let mut users = Vec::new();
    for name in &usage.entries {
        match entries.lookup(name) {
            Some(entry) => {
                if seen.insert(entry.id.clone()) {
                    users.push(entry);
                }
            }
            None => {
                unknown.insert(name.clone());
            }
        }
    }
    users
}

fn by_domain<'a>(
    entries: &EntrySet,
    users: &[&'a EntryRef],
) -> BTreeMap<SharingDomain, Vec<&'a EntryRef>> {
    let mut domains: BTreeMap<SharingDomain, Vec<&'a EntryRef>> = BTreeMap::new();
    for &user in users {
        domains.entry(domain_of(entries, user)).or_default().push(user);
    }
    domains
}

/// Place one module for the users of one domain.
fn place_module(
    plan: &mut PartitionPlan,
    entries: &EntrySet,
    options: &SplitOptions,
    matcher: &RuleMatcher,
    usage: &ModuleUsage,
    domain: SharingDomain,
    users: &[&EntryRef],
) {
    let source = options.absolute_source(&usage.source);

    let Some(rule) = matcher.select(domain, &source, users.len()) else {
        // Below threshold: stays in every consuming entry bundle
        for user in users {
            plan.bundle_mut(&user.output, user.scope, domain, SharingClass::None)
                .modules
                .insert(usage.module.clone());
        }
        return;
    };

    let (name, scope) = match &rule.target {
        BundleTarget::Fixed { name } => {
            let scope = match domain {
                SharingDomain::Shared => ScopeId::ROOT,
                SharingDomain::Independent(id) => id,
            };
            (name.clone(), scope)
        }
        BundleTarget::ScopeLocal { base } => {
            let relative = options.app_relative_source(&usage.source);
            scope_local_target(entries, base, users, &relative)
        }
    };

    tracing::debug!(
        "module `{}` -> `{}` (rule `{}`, {} user(s))",
        usage.module,
        name,
        rule.name,
        users.len()
    );

    plan.bundle_mut(&name, scope, domain, rule.class)
        .modules
        .insert(usage.module.clone());
    for user in users {
        plan.link(&user.output, &name);
    }
}

/// Resolve a scope-local target for the shared domain.
///
/// - a root-scope user promotes the module to the global bundle;
/// - users all in one sub-package keep it in `<root>/<base>`;
/// - users spread over several sub-packages pick the one whose root
///   contains the module's source path, else the global bundle.
fn scope_local_target(
    entries: &EntrySet,
    base: &str,
    users: &[&EntryRef],
    relative_source: &str,
) -> (String, ScopeId) {
    let scopes: BTreeSet<ScopeId> = users.iter().map(|u| u.scope).collect();

    if scopes.contains(&ScopeId::ROOT) {
        return (base.to_string(), ScopeId::ROOT);
    }

    if scopes.len() == 1 {
        if let Some(&only) = scopes.iter().next() {
            return (entries.scope(only).qualify(base), only);
        }
    }

    scopes
        .iter()
        .copied()
        .find(|&id| !relative_source.is_empty() && entries.scope(id).contains(relative_source))
        .map(|id| (entries.scope(id).qualify(base), id))
        .unwrap_or_else(|| (base.to_string(), ScopeId::ROOT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AppManifest, EntryId, SpecifierRules};
    use crate::resolver::resolve_with_rules;
    use crate::test_support::MemoryUsageReader;

    fn options() -> SplitOptions {
        SplitOptions::from_config(&Config::default(), Path::new("/proj/src")).unwrap()
    }

    fn resolve(app_json: &str, reader: MemoryUsageReader) -> EntrySet {
        let manifest = AppManifest::parse(app_json, "app.json").unwrap();
        resolve_with_rules(&manifest, &SpecifierRules::default(), &reader).entries
    }

    fn two_scope(independent: bool) -> EntrySet {
        resolve(
            &format!(
                r#"{{ "pages": ["index"], "subPackages": [{{ "root": "sub", "pages": ["a"], "independent": {} }}] }}"#,
                independent
            ),
            MemoryUsageReader::new()
                .with_components("index", &["./comp1"])
                .with_components("sub/a", &["../../comp1"]),
        )
    }

    fn run(entries: &EntrySet, facts: Vec<ModuleUsage>) -> (PartitionPlan, Vec<Diagnostic>) {
        run_with(entries, facts, &options())
    }

    fn run_with(
        entries: &EntrySet,
        facts: Vec<ModuleUsage>,
        opts: &SplitOptions,
    ) -> (PartitionPlan, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let plan = plan(entries, &UsageFacts::new(facts), opts, &mut diagnostics).unwrap();
        (plan, diagnostics)
    }

    fn names(bundles: Vec<&PlannedBundle>) -> Vec<&str> {
        bundles.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_shared_component_lands_in_commons() {
        let entries = two_scope(false);
        assert_eq!(entries.ids(), vec!["index", "sub/a", "app", "comp1"]);

        let (plan, diagnostics) = run(
            &entries,
            vec![ModuleUsage::new("comp1", "comp1.js", ["index", "sub/a"])],
        );
        assert!(diagnostics.is_empty());

        assert_eq!(names(plan.bundles_containing("comp1")), vec!["commons"]);
        let commons = plan.bundle("commons").unwrap();
        assert_eq!(commons.class, SharingClass::Commons);
        assert_eq!(commons.scope, ScopeId::ROOT);
        assert_eq!(plan.links_for("index"), ["runtime", "commons"]);
        assert_eq!(plan.links_for("sub/a"), ["runtime", "commons"]);
        assert_eq!(plan.links_for("app"), ["runtime"]);
    }

    #[test]
    fn test_independent_scope_is_isolated() {
        let entries = two_scope(true);
        assert_eq!(entries.ids(), vec!["index", "sub/a", "app", "comp1"]);

        let (plan, _) = run(
            &entries,
            vec![ModuleUsage::new("comp1", "comp1.js", ["index", "sub/a"])],
        );

        let holders = plan.bundles_containing("comp1");
        assert_eq!(names(holders.clone()), vec!["index", "sub/a"]);
        assert_eq!(holders[0].scope, ScopeId::ROOT);
        assert_eq!(entries.scope(holders[1].scope).name, "sub");
        assert!(plan.bundle("commons").is_none());

        assert_eq!(plan.links_for("index"), ["runtime"]);
        assert_eq!(plan.links_for("sub/a"), ["sub/runtime"]);
        assert_eq!(plan.bundle("sub/runtime").unwrap().class, SharingClass::Runtime);
    }

    #[test]
    fn test_independent_private_bundles() {
        let entries = resolve(
            r#"{ "pages": ["index", "logs"], "subPackages": [{ "root": "solo", "pages": ["a", "b"], "independent": true }] }"#,
            MemoryUsageReader::new(),
        );
        let (plan, _) = run(
            &entries,
            vec![
                ModuleUsage::new(
                    "lodash",
                    "/proj/node_modules/lodash/lodash.js",
                    ["index", "logs", "solo/a", "solo/b"],
                ),
                ModuleUsage::new("util", "utils/util.js", ["index", "logs", "solo/a", "solo/b"]),
            ],
        );

        assert_eq!(names(plan.bundles_containing("lodash")), vec!["solo/vendor", "vendor"]);
        assert_eq!(names(plan.bundles_containing("util")), vec!["commons", "solo/commons"]);

        // No independent bundle is linked from outside its scope
        for (entry, links) in &plan.links {
            let outside = !entry.starts_with("solo/");
            for link in links {
                let bundle = plan.bundle(link).unwrap();
                if outside {
                    assert_eq!(bundle.domain, SharingDomain::Shared, "{} -> {}", entry, link);
                }
            }
        }
        assert_eq!(plan.links_for("solo/a"), ["solo/runtime", "solo/vendor", "solo/commons"]);
        assert_eq!(plan.links_for("index"), ["runtime", "vendor", "commons"]);
    }

    #[test]
    fn test_threshold_boundary() {
        let entries = resolve(
            r#"{ "pages": ["p1", "p2", "p3"] }"#,
            MemoryUsageReader::new(),
        );
        let mut opts = options();
        opts.min_shared_entries = 3;

        let (below, _) = run_with(
            &entries,
            vec![ModuleUsage::new("m", "m.js", ["p1", "p2"])],
            &opts,
        );
        assert_eq!(names(below.bundles_containing("m")), vec!["p1", "p2"]);
        assert!(below.bundles_containing("m").iter().all(|b| b.class == SharingClass::None));

        let (at, _) = run_with(
            &entries,
            vec![ModuleUsage::new("m", "m.js", ["p1", "p2", "p3"])],
            &opts,
        );
        assert_eq!(names(at.bundles_containing("m")), vec!["commons"]);
    }

    #[test]
    fn test_threshold_applies_to_vendor() {
        let entries = resolve(r#"{ "pages": ["p1", "p2"] }"#, MemoryUsageReader::new());
        let (plan, _) = run(
            &entries,
            vec![ModuleUsage::new("dayjs", "/proj/node_modules/dayjs/index.js", ["p1"])],
        );
        assert_eq!(names(plan.bundles_containing("dayjs")), vec!["p1"]);
        assert!(plan.bundle("vendor").is_none());
    }

    #[test]
    fn test_duplicate_entry_names_count_once() {
        let entries = resolve(r#"{ "pages": ["p1", "p2"] }"#, MemoryUsageReader::new());
        let (plan, _) = run(&entries, vec![ModuleUsage::new("m", "m.js", ["p1", "p1"])]);
        assert_eq!(names(plan.bundles_containing("m")), vec!["p1"]);
    }

    #[test]
    fn test_subpackage_local_commons() {
        let entries = resolve(
            r#"{ "pages": ["index"], "subPackages": [{ "root": "shop", "pages": ["cart", "list"] }] }"#,
            MemoryUsageReader::new(),
        );
        let (plan, _) = run(
            &entries,
            vec![ModuleUsage::new("price", "shop/utils/price.js", ["shop/cart", "shop/list"])],
        );

        assert_eq!(names(plan.bundles_containing("price")), vec!["shop/commons"]);
        assert_eq!(entries.scope(plan.bundle("shop/commons").unwrap().scope).name, "shop");
        assert_eq!(plan.links_for("shop/cart"), ["runtime", "shop/commons"]);
        assert_eq!(plan.links_for("index"), ["runtime"]);
    }

    #[test]
    fn test_tie_break_by_source_containment() {
        let entries = resolve(
            r#"{ "pages": ["index"], "subPackages": [
                { "root": "shop", "pages": ["cart"] },
                { "root": "user", "pages": ["me"] }
            ] }"#,
            MemoryUsageReader::new(),
        );
        let (plan, _) = run(
            &entries,
            vec![
                ModuleUsage::new(
                    "cart-util",
                    "/proj/src/user/cart-util.js",
                    ["shop/cart", "user/me"],
                ),
                ModuleUsage::new("shared-util", "lib/shared.js", ["shop/cart", "user/me"]),
            ],
        );

        assert_eq!(names(plan.bundles_containing("cart-util")), vec!["user/commons"]);
        assert_eq!(names(plan.bundles_containing("shared-util")), vec!["commons"]);
    }

    #[test]
    fn test_module_in_one_bundle_per_domain() {
        let entries = two_scope(false);
        let (plan, _) = run(
            &entries,
            vec![
                ModuleUsage::new("a", "a.js", ["index", "sub/a", "comp1"]),
                ModuleUsage::new("b", "/proj/node_modules/b/index.js", ["index", "comp1"]),
            ],
        );
        for module in ["a", "b"] {
            let shared: Vec<_> = plan
                .bundles_containing(module)
                .into_iter()
                .filter(|b| b.domain == SharingDomain::Shared)
                .collect();
            assert_eq!(shared.len(), 1, "{}", module);
        }
    }

    #[test]
    fn test_unknown_entries_are_reported() {
        let entries = two_scope(false);
        let (plan, diagnostics) = run(
            &entries,
            vec![ModuleUsage::new("m", "m.js", ["index", "ghost", "ghost"])],
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("`ghost`"));
        assert_eq!(names(plan.bundles_containing("m")), vec!["index"]);
    }

    #[test]
    fn test_entries_named_by_output() {
        let entries = resolve(
            r#"{ "pages": ["index", "logs"] }"#,
            MemoryUsageReader::new()
                .with_components("index", &["/npm-components/ui/button"])
                .with_components("logs", &["/npm-components/ui/button"]),
        );
        assert!(entries.contains(&EntryId::new("node_modules/ui/button")));

        let (plan, diagnostics) = run(
            &entries,
            vec![ModuleUsage::new(
                "style-helper",
                "/proj/node_modules/ui/helper.js",
                ["npm-components/ui/button", "index"],
            )],
        );
        assert!(diagnostics.is_empty());
        assert_eq!(names(plan.bundles_containing("style-helper")), vec!["vendor"]);
        assert_eq!(plan.links_for("npm-components/ui/button"), ["runtime", "vendor"]);
    }

    #[test]
    fn test_invalid_vendor_test_is_config_error() {
        let mut config = Config::default();
        config.split.vendor_test = Some("(".to_string());
        assert!(matches!(
            SplitOptions::from_config(&config, Path::new("/proj/src")),
            Err(ConfigError::InvalidVendorTest { .. })
        ));
    }
}
