//! Partition planning operations.

use std::path::Path;

use anyhow::Result;

use crate::core::{AppWorkspace, EntrySet, UsageFacts};
use crate::partition::rules::{self, RuleExport};
use crate::partition::{self, PartitionPlan, SplitOptions};
use crate::util::diagnostic::Diagnostic;

/// Split settings for the workspace, with the vendor test validated.
pub fn split_options(ws: &AppWorkspace) -> Result<SplitOptions> {
    Ok(SplitOptions::from_config(ws.config(), ws.app_root())?)
}

/// Plan the partition of an application from a usage fact file.
pub fn plan_app(
    ws: &AppWorkspace,
    entries: &EntrySet,
    usage_path: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<PartitionPlan> {
    let facts = UsageFacts::load(usage_path)?;
    plan_facts(ws, entries, &facts, diagnostics)
}

/// Plan the partition of an application from in-memory facts.
pub fn plan_facts(
    ws: &AppWorkspace,
    entries: &EntrySet,
    facts: &UsageFacts,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<PartitionPlan> {
    let options = split_options(ws)?;
    let plan = partition::plan(entries, facts, &options, diagnostics)?;

    tracing::info!(
        "planned {} bundle(s) from {} module(s), {} shared",
        plan.bundles.len(),
        facts.len(),
        plan.shared_bundles().count()
    );

    Ok(plan)
}

/// The partition rules in the host bundler's vocabulary.
pub fn export_app_rules(ws: &AppWorkspace, entries: &EntrySet) -> Result<RuleExport> {
    let options = split_options(ws)?;
    let rule_set = rules::default_rules(entries, &options);
    Ok(rules::export_rules(&rule_set, entries, &options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfigError, ModuleUsage};
    use crate::ops::resolve::resolve_app;
    use crate::test_support::AppFixture;

    #[test]
    fn test_plan_from_fact_file() {
        let (tmp, ws) = AppFixture::shared_component(false).create();
        let facts_path = tmp.path().join("usage.json");
        std::fs::write(
            &facts_path,
            r#"[{ "module": "comp1", "source": "comp1.js", "entries": ["index", "sub/a"] }]"#,
        )
        .unwrap();

        let resolved = resolve_app(&ws).unwrap();
        let mut diagnostics = Vec::new();
        let entries = &resolved.resolution.entries;
        let plan = plan_app(&ws, entries, &facts_path, &mut diagnostics).unwrap();

        assert!(diagnostics.is_empty());
        let commons = plan.bundle("commons").unwrap();
        assert!(commons.modules.contains("comp1"));
        assert_eq!(plan.links_for("sub/a"), ["runtime", "commons"]);
    }

    #[test]
    fn test_unknown_fact_entry_warns() {
        let (_tmp, ws) = AppFixture::shared_component(false).create();
        let resolved = resolve_app(&ws).unwrap();
        let facts = UsageFacts::new(vec![ModuleUsage::new("m", "m.js", ["index", "nope"])]);

        let mut diagnostics = Vec::new();
        plan_facts(&ws, &resolved.resolution.entries, &facts, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_invalid_vendor_test_is_fatal() {
        let (_tmp, ws) = AppFixture::shared_component(false)
            .with_config("[app]\nentry = \"src/app.js\"\n\n[split]\nvendor_test = \"(\"\n")
            .create();
        let resolved = resolve_app(&ws).unwrap();

        let err = export_app_rules(&ws, &resolved.resolution.entries).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidVendorTest { .. })
        ));
    }

    #[test]
    fn test_export_independent_runtime() {
        let (_tmp, ws) = AppFixture::shared_component(true).create();
        let resolved = resolve_app(&ws).unwrap();

        let export = export_app_rules(&ws, &resolved.resolution.entries).unwrap();
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["runtimeChunks"][""], "runtime");
        assert_eq!(json["runtimeChunks"]["sub"], "sub/runtime");
        assert_eq!(json["cacheGroups"]["vendor"]["priority"], 20);
    }
}
