//! The full build pipeline over a directory of generated bundles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::assembler::{self, AssembleOptions, BUNDLE_EXTENSION};
use crate::core::AppWorkspace;
use crate::ops::assets::{self, EmitReport};
use crate::ops::plan::plan_app;
use crate::ops::resolve::resolve_in_session;
use crate::ops::session::BuildSession;
use crate::util::diagnostic::Diagnostic;
use crate::util::fs;
use crate::util::hash;

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Module usage fact file written by the host bundler
    pub usage: PathBuf,

    /// Directory holding the host bundler's generated `.js` bundles
    pub input: PathBuf,

    /// Copy non-script assets next to the bundles
    pub copy_assets: bool,

    /// Show a progress bar while copying
    pub progress: bool,
}

/// What a pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    /// Bundle names written (or already up to date)
    pub bundles: Vec<String>,

    /// Bundles dropped from the output
    pub removed: Vec<String>,

    pub assets: EmitReport,

    /// Every recovered error of the run, in pipeline order
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutcome {
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }
}

/// Read every generated bundle below `dir`, keyed by bundle name.
pub fn read_generated(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut generated = BTreeMap::new();
    for (name, path) in fs::files_with_extension(dir, BUNDLE_EXTENSION)? {
        generated.insert(name, fs::read_to_string(&path)?);
    }
    tracing::debug!("read {} generated bundle(s) from {}", generated.len(), dir.display());
    Ok(generated)
}

/// Resolve, plan, assemble and emit.
///
/// Returns `None` when the session started a newer resolution while this
/// one was running; nothing is written in that case.
pub fn assemble_app(
    ws: &AppWorkspace,
    session: &BuildSession,
    options: &PipelineOptions,
) -> Result<Option<BuildOutcome>> {
    let assemble_options = AssembleOptions::from_config(ws.config())?;
    if ws.config().clear() {
        ws.check_output_dir()?;
    }

    let Some(resolved) = resolve_in_session(ws, session)? else {
        return Ok(None);
    };
    let entries = &resolved.resolution.entries;
    let mut diagnostics = resolved.resolution.diagnostics.clone();

    let plan = plan_app(ws, entries, &options.usage, &mut diagnostics)?;

    let generated = read_generated(&options.input).with_context(|| {
        format!("failed to read generated bundles from {}", options.input.display())
    })?;
    let output = assembler::assemble(entries, &plan, generated, &assemble_options);
    diagnostics.extend(output.diagnostics);

    let out_dir = ws.output_dir();
    if session.take_clear() && ws.config().clear() {
        tracing::debug!("clearing {}", out_dir.display());
        fs::remove_dir_all_if_exists(out_dir)?;
    }

    let mut bundles = Vec::with_capacity(output.bundles.len());
    for (name, source) in output.bundles {
        let dest = out_dir.join(format!("{}.{}", name, BUNDLE_EXTENSION));
        if !hash::is_up_to_date(&dest, source.as_bytes()) {
            fs::write_string(&dest, &source)?;
        }
        bundles.push(name);
    }

    let assets = if options.copy_assets {
        let patterns = assets::asset_patterns(ws, entries, &resolved.resolution.tab_bar_assets);
        let found = assets::collect_assets(ws, &patterns, &mut diagnostics)?;
        assets::emit_assets(&found, out_dir, options.progress, &mut diagnostics)?
    } else {
        EmitReport::default()
    };

    tracing::info!("wrote {} bundle(s) to {}", bundles.len(), out_dir.display());

    Ok(Some(BuildOutcome {
        bundles,
        removed: output.removed,
        assets,
        diagnostics,
    }))
}
