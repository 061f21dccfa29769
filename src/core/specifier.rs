//! Component specifiers as authored in `usingComponents`.

use crate::core::entry::{normalize, EntryId, EntryRef, Origin};

/// A classified component specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentReference {
    /// Provided by a host plugin; never traversed
    Plugin(String),
    /// Installed package component, rewritten to its install path
    /// (relative to the project root)
    Package(String),
    /// Path inside the application, as authored
    Local(String),
}

/// Prefix rules for classifying specifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierRules {
    plugin_prefix: String,
    package_prefix: String,
    package_dir: String,
    package_output_dir: String,
}

impl SpecifierRules {
    pub fn new(
        plugin_prefix: impl Into<String>,
        package_prefix: impl Into<String>,
        package_dir: impl Into<String>,
        package_output_dir: impl Into<String>,
    ) -> Self {
        SpecifierRules {
            plugin_prefix: plugin_prefix.into(),
            package_prefix: package_prefix.into(),
            package_dir: package_dir.into(),
            package_output_dir: package_output_dir.into(),
        }
    }

    /// Output name of an entry: package components move from the install
    /// directory to the package output directory.
    pub fn output_name(&self, id: &EntryId, origin: Origin) -> String {
        match origin {
            Origin::Package => self.package_output_path(id.as_str()),
            Origin::App => id.as_str().to_string(),
        }
    }

    /// Map a project-relative path under the install directory to its
    /// place under the package output directory. Other paths are returned
    /// unchanged.
    pub fn package_output_path(&self, path: &str) -> String {
        let package_dir = self.package_dir.trim_matches('/');
        if let Some(rest) = path.strip_prefix(package_dir) {
            if rest.is_empty() || rest.starts_with('/') {
                return format!("{}{}", self.package_output_dir.trim_matches('/'), rest);
            }
        }
        path.to_string()
    }

    /// Classify a raw specifier. Plugin is checked before package.
    pub fn classify(&self, raw: &str) -> ComponentReference {
        if !self.plugin_prefix.is_empty() && raw.starts_with(&self.plugin_prefix) {
            return ComponentReference::Plugin(raw.to_string());
        }

        if !self.package_prefix.is_empty() {
            if let Some(rest) = raw.strip_prefix(&self.package_prefix) {
                if rest.is_empty() || rest.starts_with('/') {
                    let path = normalize(&format!("{}{}", self.package_dir, rest));
                    return ComponentReference::Package(path);
                }
            }
        }

        ComponentReference::Local(raw.to_string())
    }

    /// Resolve a specifier found in `referrer`'s descriptor to the id and
    /// origin of the referenced component. Plugin references resolve to
    /// `None`.
    ///
    /// Relative specifiers keep the referrer's origin; a leading `/` always
    /// resolves from the app root.
    pub fn resolve(&self, referrer: &EntryRef, raw: &str) -> Option<(EntryId, Origin)> {
        match self.classify(raw) {
            ComponentReference::Plugin(_) => None,
            ComponentReference::Package(path) => Some((EntryId::new(path), Origin::Package)),
            ComponentReference::Local(path) => {
                if path.starts_with('/') {
                    Some((EntryId::new(path), Origin::App))
                } else {
                    Some((referrer.id.join_relative(&path), referrer.origin))
                }
            }
        }
    }
}

impl Default for SpecifierRules {
    fn default() -> Self {
        use crate::util::config::{
            DEFAULT_PACKAGE_DIR, DEFAULT_PACKAGE_OUTPUT_DIR, DEFAULT_PACKAGE_PREFIX,
            DEFAULT_PLUGIN_PREFIX,
        };
        SpecifierRules::new(
            DEFAULT_PLUGIN_PREFIX,
            DEFAULT_PACKAGE_PREFIX,
            DEFAULT_PACKAGE_DIR,
            DEFAULT_PACKAGE_OUTPUT_DIR,
        )
    }
}
