//! Configuration file support for mpbundle.
//!
//! Two configuration file locations are read:
//! - Global: `~/.mpbundle/config.toml` - User-wide defaults
//! - Project: `mpbundle.toml` in the project root - Project settings
//!
//! Project config takes precedence over global config. Every field is
//! optional in the file; the accessors below supply the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_NAME: &str = "mpbundle.toml";

pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".ts"];
pub const DEFAULT_PLUGIN_PREFIX: &str = "plugin://";
pub const DEFAULT_PACKAGE_PREFIX: &str = "/npm-components";
pub const DEFAULT_PACKAGE_DIR: &str = "node_modules";
pub const DEFAULT_PACKAGE_OUTPUT_DIR: &str = "npm-components";
pub const DEFAULT_VENDOR_TEST: &str = r"[\\/]node_modules[\\/]";
pub const DEFAULT_MIN_SHARED_ENTRIES: usize = 2;

/// mpbundle configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application entry and output settings
    pub app: AppConfig,

    /// Component reference resolution
    pub resolve: ResolveConfig,

    /// Non-script asset selection
    pub assets: AssetsConfig,

    /// Shared bundle partitioning
    pub split: SplitConfig,

    /// Bundle rewriting
    pub output: OutputConfig,
}

/// `[app]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the application bootstrap script (e.g. `src/app.js`)
    pub entry: Option<PathBuf>,

    /// Output directory for the final bundle set
    pub output_dir: Option<PathBuf>,

    /// Remove the output directory before the first emission
    pub clear: Option<bool>,
}

/// `[resolve]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Candidate script extensions, in lookup order
    pub extensions: Option<Vec<String>>,

    /// Specifier prefix marking plugin components
    pub plugin_prefix: Option<String>,

    /// Specifier prefix marking installed package components
    pub package_prefix: Option<String>,

    /// Directory packages are installed into, relative to the project root
    pub package_dir: Option<String>,

    /// Directory package components are emitted under
    pub package_output_dir: Option<String>,
}

/// `[assets]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Extra glob patterns (relative to the app root) to copy
    pub include: Vec<String>,

    /// Glob patterns to leave out
    pub exclude: Vec<String>,
}

/// `[split]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Minimum distinct-entry usage before a module is shared
    pub min_shared_entries: Option<usize>,

    /// Regex identifying third-party modules by source path
    pub vendor_test: Option<String>,

    /// Name of the commons bundle
    pub commons_name: Option<String>,

    /// Name of the vendor bundle
    pub vendor_name: Option<String>,

    /// Name of the runtime bundle
    pub runtime_name: Option<String>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Global binding of the execution target (`wx`, `my` or `global`)
    pub global_object: Option<String>,

    /// Global identifier emitted by the host bundler
    pub host_global: Option<String>,

    /// Name of the synthetic asset placeholder bundle
    pub placeholder: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // App settings
        if other.app.entry.is_some() {
            self.app.entry = other.app.entry;
        }
        if other.app.output_dir.is_some() {
            self.app.output_dir = other.app.output_dir;
        }
        if other.app.clear.is_some() {
            self.app.clear = other.app.clear;
        }

        // Resolve settings
        if other.resolve.extensions.is_some() {
            self.resolve.extensions = other.resolve.extensions;
        }
        if other.resolve.plugin_prefix.is_some() {
            self.resolve.plugin_prefix = other.resolve.plugin_prefix;
        }
        if other.resolve.package_prefix.is_some() {
            self.resolve.package_prefix = other.resolve.package_prefix;
        }
        if other.resolve.package_dir.is_some() {
            self.resolve.package_dir = other.resolve.package_dir;
        }
        if other.resolve.package_output_dir.is_some() {
            self.resolve.package_output_dir = other.resolve.package_output_dir;
        }

        // Asset lists are replaced, not concatenated
        if !other.assets.include.is_empty() {
            self.assets.include = other.assets.include;
        }
        if !other.assets.exclude.is_empty() {
            self.assets.exclude = other.assets.exclude;
        }

        // Split settings
        if other.split.min_shared_entries.is_some() {
            self.split.min_shared_entries = other.split.min_shared_entries;
        }
        if other.split.vendor_test.is_some() {
            self.split.vendor_test = other.split.vendor_test;
        }
        if other.split.commons_name.is_some() {
            self.split.commons_name = other.split.commons_name;
        }
        if other.split.vendor_name.is_some() {
            self.split.vendor_name = other.split.vendor_name;
        }
        if other.split.runtime_name.is_some() {
            self.split.runtime_name = other.split.runtime_name;
        }

        // Output settings
        if other.output.global_object.is_some() {
            self.output.global_object = other.output.global_object;
        }
        if other.output.host_global.is_some() {
            self.output.host_global = other.output.host_global;
        }
        if other.output.placeholder.is_some() {
            self.output.placeholder = other.output.placeholder;
        }
    }

    /// Output directory, relative paths resolved against the project root.
    pub fn output_dir(&self) -> PathBuf {
        self.app
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("dist"))
    }

    /// Whether the output directory is cleared before the first emission.
    pub fn clear(&self) -> bool {
        self.app.clear.unwrap_or(true)
    }

    /// Candidate script extensions.
    pub fn extensions(&self) -> Vec<String> {
        self.resolve.extensions.clone().unwrap_or_else(|| {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        })
    }

    pub fn plugin_prefix(&self) -> &str {
        self.resolve
            .plugin_prefix
            .as_deref()
            .unwrap_or(DEFAULT_PLUGIN_PREFIX)
    }

    pub fn package_prefix(&self) -> &str {
        self.resolve
            .package_prefix
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGE_PREFIX)
    }

    pub fn package_dir(&self) -> &str {
        self.resolve
            .package_dir
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGE_DIR)
    }

    pub fn package_output_dir(&self) -> &str {
        self.resolve
            .package_output_dir
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGE_OUTPUT_DIR)
    }

    /// Minimum distinct-entry usage for sharing (never below 1).
    pub fn min_shared_entries(&self) -> usize {
        self.split
            .min_shared_entries
            .unwrap_or(DEFAULT_MIN_SHARED_ENTRIES)
            .max(1)
    }

    pub fn vendor_test(&self) -> &str {
        self.split
            .vendor_test
            .as_deref()
            .unwrap_or(DEFAULT_VENDOR_TEST)
    }

    pub fn commons_name(&self) -> &str {
        self.split.commons_name.as_deref().unwrap_or("commons")
    }

    pub fn vendor_name(&self) -> &str {
        self.split.vendor_name.as_deref().unwrap_or("vendor")
    }

    pub fn runtime_name(&self) -> &str {
        self.split.runtime_name.as_deref().unwrap_or("runtime")
    }

    pub fn global_object(&self) -> &str {
        self.output.global_object.as_deref().unwrap_or("wx")
    }

    pub fn host_global(&self) -> &str {
        self.output.host_global.as_deref().unwrap_or("window")
    }

    pub fn placeholder(&self) -> &str {
        self.output.placeholder.as_deref().unwrap_or("__assets__")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (mpbundle.toml)
/// 2. Global config (~/.mpbundle/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global mpbundle config directory (~/.mpbundle).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".mpbundle"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.app.entry.is_none());
        assert_eq!(config.extensions(), vec![".js", ".ts"]);
        assert_eq!(config.min_shared_entries(), 2);
        assert_eq!(config.commons_name(), "commons");
        assert_eq!(config.vendor_name(), "vendor");
        assert_eq!(config.runtime_name(), "runtime");
        assert_eq!(config.plugin_prefix(), "plugin://");
        assert_eq!(config.global_object(), "wx");
        assert!(config.clear());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("mpbundle.toml");

        std::fs::write(
            &config_path,
            r#"
[app]
entry = "src/app.ts"
clear = false

[resolve]
extensions = [".ts", ".js"]

[split]
min_shared_entries = 3
commons_name = "common"

[output]
global_object = "my"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.app.entry, Some(PathBuf::from("src/app.ts")));
        assert!(!config.clear());
        assert_eq!(config.extensions(), vec![".ts", ".js"]);
        assert_eq!(config.min_shared_entries(), 3);
        assert_eq!(config.commons_name(), "common");
        assert_eq!(config.global_object(), "my");
    }

    #[test]
    fn test_min_shared_entries_floor() {
        let mut config = Config::default();
        config.split.min_shared_entries = Some(0);
        assert_eq!(config.min_shared_entries(), 1);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.app.entry = Some(PathBuf::from("src/app.js"));
        base.split.vendor_name = Some("vendors".to_string());

        let mut override_cfg = Config::default();
        override_cfg.split.vendor_name = Some("libs".to_string());

        base.merge(override_cfg);

        assert_eq!(base.vendor_name(), "libs");
        assert_eq!(base.app.entry, Some(PathBuf::from("src/app.js"))); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("mpbundle.toml");

        std::fs::write(
            &global_path,
            r#"
[split]
min_shared_entries = 4
runtime_name = "boot"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[app]
entry = "src/app.js"

[split]
min_shared_entries = 2
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);

        assert_eq!(config.min_shared_entries(), 2);
        assert_eq!(config.runtime_name(), "boot");
        assert_eq!(config.app.entry, Some(PathBuf::from("src/app.js")));
    }
}
