//! Workspace - central configuration hub.
//!
//! An [`AppWorkspace`] ties the project root, the application root (the
//! directory holding `app.json`) and the merged configuration together and
//! answers path questions for entries: where an entry's script lives and
//! which output name the host bundler emits it under.

use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::core::entry::{EntryId, EntryKind, EntryRef, Origin};
use crate::core::specifier::SpecifierRules;
use crate::util::config::Config;
use crate::util::fs;

/// Name of the application manifest next to the app entry script.
pub const APP_MANIFEST_NAME: &str = "app.json";

/// Id of the synthetic application bootstrap entry.
pub const APP_ENTRY_ID: &str = "app";

/// Fatal configuration errors. These stop the pipeline.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("could not find `mpbundle.toml` in `{}` or any parent directory", dir.display())]
    #[diagnostic(
        code(mpbundle::config::not_found),
        help("Create an `mpbundle.toml` with an `[app]` section pointing at app.js")
    )]
    NotFound { dir: PathBuf },

    #[error("no application entry configured")]
    #[diagnostic(
        code(mpbundle::config::missing_entry),
        help("Set `entry` in the `[app]` section of mpbundle.toml")
    )]
    MissingAppEntry,

    #[error("application entry `{}` does not exist", path.display())]
    #[diagnostic(code(mpbundle::config::entry_not_found))]
    AppEntryNotFound { path: PathBuf },

    #[error("failed to read `{}`", path.display())]
    #[diagnostic(code(mpbundle::config::manifest_unreadable))]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed application manifest: {message}")]
    #[diagnostic(
        code(mpbundle::config::manifest_malformed),
        help("`pages` must be a list of strings and `subpackages` a list of objects")
    )]
    ManifestMalformed {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("invalid vendor test `{pattern}`: {message}")]
    #[diagnostic(code(mpbundle::config::invalid_vendor_test))]
    InvalidVendorTest { pattern: String, message: String },

    #[error("unknown global object `{name}`")]
    #[diagnostic(
        code(mpbundle::config::unknown_global_object),
        help("Use one of `wx`, `my` or `global`")
    )]
    UnknownGlobalObject { name: String },

    #[error(
        "refusing to clear output directory `{}`: it contains the project",
        path.display()
    )]
    #[diagnostic(
        code(mpbundle::config::unsafe_output_dir),
        help("Point `[app] output_dir` at a dedicated directory, or set `clear = false`")
    )]
    UnsafeOutputDir { path: PathBuf },
}

/// The application being built.
#[derive(Debug, Clone)]
pub struct AppWorkspace {
    /// Directory holding mpbundle.toml; package components resolve here
    project_root: PathBuf,

    /// The application bootstrap script
    app_entry: PathBuf,

    /// Directory holding app.json; entry ids are relative to it
    app_root: PathBuf,

    /// Where the final bundle set is written
    output_dir: PathBuf,

    /// Merged configuration
    config: Config,
}

impl AppWorkspace {
    /// Create a workspace from a project root and its merged configuration.
    ///
    /// Relative paths in the configuration are resolved against the project
    /// root. The app entry must exist.
    pub fn new(project_root: &Path, config: Config) -> Result<Self, ConfigError> {
        let entry = config
            .app
            .entry
            .clone()
            .ok_or(ConfigError::MissingAppEntry)?;
        let app_entry = project_root.join(entry);
        if !app_entry.is_file() {
            return Err(ConfigError::AppEntryNotFound { path: app_entry });
        }

        let app_root = app_entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_root.to_path_buf());
        let output_dir = project_root.join(config.output_dir());

        Ok(AppWorkspace {
            project_root: project_root.to_path_buf(),
            app_entry,
            app_root,
            output_dir,
            config,
        })
    }

    /// Override the output directory (CLI flag).
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = if dir.is_absolute() {
            dir
        } else {
            self.project_root.join(dir)
        };
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn app_entry(&self) -> &Path {
        &self.app_entry
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fail when clearing the output directory would delete the project
    /// root or the app sources.
    pub fn check_output_dir(&self) -> Result<(), ConfigError> {
        let out = fs::normalize_path(&self.output_dir);
        let contains = |dir: &Path| fs::normalize_path(dir).starts_with(&out);
        if contains(&self.project_root) || contains(&self.app_root) {
            return Err(ConfigError::UnsafeOutputDir {
                path: self.output_dir.clone(),
            });
        }
        Ok(())
    }

    /// Path of `app.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.app_root.join(APP_MANIFEST_NAME)
    }

    /// Specifier classification rules from `[resolve]`.
    pub fn specifier_rules(&self) -> SpecifierRules {
        SpecifierRules::new(
            self.config.plugin_prefix(),
            self.config.package_prefix(),
            self.config.package_dir(),
            self.config.package_output_dir(),
        )
    }

    /// Directory an entry id of the given origin is relative to.
    pub fn base_dir(&self, origin: Origin) -> &Path {
        match origin {
            Origin::App => &self.app_root,
            Origin::Package => &self.project_root,
        }
    }

    /// Extension-less path of an entry on disk.
    pub fn entry_stem(&self, entry: &EntryRef) -> PathBuf {
        self.base_dir(entry.origin).join(entry.id.as_str())
    }

    /// The script file backing an entry, trying each configured extension
    /// in order. The root app always uses the configured entry script.
    pub fn script_path(&self, entry: &EntryRef) -> Option<PathBuf> {
        if entry.kind == EntryKind::RootApp {
            return Some(self.app_entry.clone());
        }
        let stem = self.entry_stem(entry);
        self.config
            .extensions()
            .iter()
            .map(|ext| append_extension(&stem, ext))
            .find(|candidate| candidate.is_file())
    }

    /// Output name of an entry under the configured package directories.
    pub fn output_name(&self, id: &EntryId, origin: Origin) -> String {
        self.specifier_rules().output_name(id, origin)
    }
}

/// Append an extension (with or without a leading dot) to a path.
fn append_extension(stem: &Path, ext: &str) -> PathBuf {
    let ext = ext.trim_start_matches('.');
    let mut s = stem.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
