//! Application resolution operations.

use anyhow::{Context, Result};

use crate::core::{AppManifest, AppWorkspace};
use crate::ops::session::BuildSession;
use crate::resolver::{self, EntryPoint, FsUsageReader, Resolution, UsageReader};
use crate::util::diagnostic::Diagnostic;
use crate::util::GlobalContext;

/// A resolved application: the Entry Set plus the compile entry points
/// derived from it.
#[derive(Debug, Clone)]
pub struct ResolvedApp {
    pub manifest: AppManifest,
    pub resolution: Resolution,
    pub entry_points: Vec<EntryPoint>,
}

impl ResolvedApp {
    /// Recovered errors from discovery and entry point lookup.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.resolution.diagnostics
    }
}

/// Locate `mpbundle.toml` from the working directory and open the
/// workspace it describes.
pub fn load_workspace(ctx: &GlobalContext) -> Result<AppWorkspace> {
    let project_root = ctx.find_project_root()?;
    let config = ctx.load_config(&project_root);
    let ws = AppWorkspace::new(&project_root, config)?;
    tracing::debug!("app root: {}", ws.app_root().display());
    Ok(ws)
}

/// Resolve the workspace's application from disk.
pub fn resolve_app(ws: &AppWorkspace) -> Result<ResolvedApp> {
    let reader = FsUsageReader::new(ws);
    resolve_app_with(ws, &reader)
}

/// Resolve the workspace's application with an explicit descriptor reader.
pub fn resolve_app_with(ws: &AppWorkspace, reader: &dyn UsageReader) -> Result<ResolvedApp> {
    let manifest = AppManifest::load(&ws.manifest_path())?;

    let mut resolution = resolver::resolve(ws, &manifest, reader);
    let (entry_points, missing) = resolver::entry_points(ws, &resolution.entries);
    resolution.diagnostics.extend(missing);

    tracing::debug!("{} compile entry point(s)", entry_points.len());

    Ok(ResolvedApp {
        manifest,
        resolution,
        entry_points,
    })
}

/// Resolve under a session ticket. Returns `None` when a newer resolution
/// started meanwhile; the stale result is dropped whole.
pub fn resolve_in_session(
    ws: &AppWorkspace,
    session: &BuildSession,
) -> Result<Option<ResolvedApp>> {
    let ticket = session.begin();
    let resolved = resolve_app(ws)
        .with_context(|| format!("failed to resolve `{}`", ws.manifest_path().display()))?;
    Ok(session.commit(ticket, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigError;
    use crate::test_support::AppFixture;

    #[test]
    fn test_resolve_app_from_disk() {
        let (_tmp, ws) = AppFixture::new(r#"{ "pages": ["pages/index"] }"#)
            .with_entry("pages/index", &["../components/card"])
            .with_entry("components/card", &[])
            .create();

        let resolved = resolve_app(&ws).unwrap();
        assert_eq!(
            resolved.resolution.entries.ids(),
            vec!["pages/index", "app", "components/card"]
        );
        assert_eq!(resolved.entry_points.len(), 3);
        assert!(resolved.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_script_is_a_warning() {
        let (_tmp, ws) = AppFixture::new(r#"{ "pages": ["pages/index", "pages/ghost"] }"#)
            .with_entry("pages/index", &[])
            .create();

        let resolved = resolve_app(&ws).unwrap();
        assert_eq!(resolved.entry_points.len(), 2);
        assert_eq!(resolved.diagnostics().len(), 1);
        assert!(resolved.diagnostics()[0].message.contains("pages/ghost"));
    }

    #[test]
    fn test_malformed_manifest_is_fatal() {
        let (_tmp, ws) = AppFixture::new("{ \"pages\": [1] }").create();

        let err = resolve_app(&ws).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ManifestMalformed { .. })
        ));
    }

    #[test]
    fn test_stale_session_result_is_dropped() {
        let (_tmp, ws) = AppFixture::new(r#"{ "pages": [] }"#).create();
        let session = BuildSession::new();

        assert!(resolve_in_session(&ws, &session).unwrap().is_some());

        let ticket = session.begin();
        let _newer = session.begin();
        assert!(session.commit(ticket, resolve_app(&ws).unwrap()).is_none());
    }
}
