//! Output assembly.
//!
//! The execution target cannot fetch chunks at runtime, so every shared
//! bundle an entry depends on is loaded by a synchronous `require` placed at
//! the top of the entry bundle. The host bundler's global identifier is
//! renamed to the target's global binding, and the synthetic placeholder
//! bundle used to carry assets through the host bundler is dropped.

pub mod globals;

pub use globals::rewrite_global;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::core::{ConfigError, EntrySet};
use crate::partition::PartitionPlan;
use crate::util::config::Config;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs::{relative_path, to_slash};

/// Global bindings the output may target.
pub const KNOWN_GLOBAL_OBJECTS: &[&str] = &["wx", "my", "global"];

/// Extension of emitted bundles.
pub const BUNDLE_EXTENSION: &str = "js";

/// Error rewriting one bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("unterminated {kind} starting on line {line}")]
    Unterminated { kind: &'static str, line: usize },
}

/// Assembler settings from `[output]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Target global binding
    pub global_object: String,

    /// Identifier the host bundler uses for the global
    pub host_global: String,

    /// Name of the synthetic asset placeholder bundle
    pub placeholder: String,
}

impl AssembleOptions {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let global_object = config.global_object();
        if !KNOWN_GLOBAL_OBJECTS.contains(&global_object) {
            return Err(ConfigError::UnknownGlobalObject {
                name: global_object.to_string(),
            });
        }
        Ok(AssembleOptions {
            global_object: global_object.to_string(),
            host_global: config.host_global().to_string(),
            placeholder: config.placeholder().to_string(),
        })
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            global_object: "wx".to_string(),
            host_global: "window".to_string(),
            placeholder: "__assets__".to_string(),
        }
    }
}

/// The final bundle set.
#[derive(Debug, Clone, Default)]
pub struct AssembledOutput {
    /// Bundle name -> final source
    pub bundles: BTreeMap<String, String>,

    /// Bundles dropped from the output (the placeholder)
    pub removed: Vec<String>,

    /// Bundles emitted unmodified after a rewrite failure
    pub diagnostics: Vec<Diagnostic>,
}

/// Path a bundle is required by from an entry, relative to the entry's
/// own output location (`sub/a` loading `commons` -> `../commons.js`).
pub fn require_path(entry_output: &str, bundle: &str) -> String {
    let dir = Path::new(entry_output).parent().unwrap_or(Path::new(""));
    let rel = to_slash(&relative_path(dir, Path::new(bundle)));
    if rel.starts_with("../") {
        format!("{}.{}", rel, BUNDLE_EXTENSION)
    } else {
        format!("./{}.{}", rel, BUNDLE_EXTENSION)
    }
}

/// The synchronous load statements an entry bundle starts with.
pub fn prelude(entry_output: &str, links: &[String]) -> Vec<String> {
    links
        .iter()
        .map(|bundle| format!("require(\"{}\");", require_path(entry_output, bundle)))
        .collect()
}

fn is_require_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("require(\"") && line.ends_with("\");")
}

/// Rewrite one bundle: remap the global and, for entry bundles, start it
/// with the loads of its shared bundles in link order.
///
/// Only the block of `require` lines at the very top counts as an earlier
/// prelude. Its lines are replaced by the full prelude; unrelated loads in
/// that block stay after it.
pub fn assemble_bundle(
    name: &str,
    source: &str,
    links: &[String],
    options: &AssembleOptions,
) -> Result<String, AssembleError> {
    let body = rewrite_global(source, &options.host_global, &options.global_object)?;
    let prelude = prelude(name, links);
    if prelude.is_empty() {
        return Ok(body);
    }

    let mut leading = Vec::new();
    let mut rest = body.as_str();
    while let Some(line) = rest.split_inclusive('\n').next() {
        if !is_require_line(line) {
            break;
        }
        leading.push(line);
        rest = &rest[line.len()..];
    }

    let mut out = String::with_capacity(body.len() + prelude.len() * 32);
    for line in &prelude {
        out.push_str(line);
        out.push('\n');
    }
    for line in leading {
        if !prelude.iter().any(|p| p == line.trim()) {
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Assemble the whole bundle set.
///
/// `generated` maps bundle names (output paths without extension) to the
/// host bundler's sources. A bundle that fails to rewrite keeps its
/// original source and is reported; the others continue.
pub fn assemble(
    entries: &EntrySet,
    plan: &PartitionPlan,
    generated: BTreeMap<String, String>,
    options: &AssembleOptions,
) -> AssembledOutput {
    let mut output = AssembledOutput::default();

    for (name, source) in generated {
        if name == options.placeholder {
            tracing::debug!("dropping placeholder bundle `{}`", name);
            output.removed.push(name);
            continue;
        }

        let links: &[String] = if entries.by_output(&name).is_some() {
            plan.links_for(&name)
        } else {
            &[]
        };

        let assembled = match assemble_bundle(&name, &source, links, options) {
            Ok(assembled) => assembled,
            Err(e) => {
                let diag = Diagnostic::warning(format!("failed to assemble bundle `{}`", name))
                    .with_context(e.to_string())
                    .with_suggestion(suggestions::ASSEMBLY_FAILED);
                tracing::warn!("{}: {}", diag.message, e);
                output.diagnostics.push(diag);
                source
            }
        };
        output.bundles.insert(name, assembled);
    }

    tracing::info!(
        "assembled {} bundle(s), {} failed",
        output.bundles.len(),
        output.diagnostics.len()
    );

    output
}
