//! Test fixtures for common test scenarios.
//!
//! An [`AppFixture`] describes a mini program source tree (mpbundle.toml,
//! app.js, app.json, page and component scripts with their descriptors)
//! and writes it below a project root.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::AppWorkspace;
use crate::util::config::{self, PROJECT_CONFIG_NAME};

/// Fixture for a complete application tree.
#[derive(Debug, Clone)]
pub struct AppFixture {
    /// mpbundle.toml content
    pub config: String,
    /// app.json content
    pub app_json: String,
    /// Files relative to the project root -> content
    pub files: Vec<(PathBuf, String)>,
}

impl AppFixture {
    /// Create a fixture with the given app.json and an `src/app.js` entry.
    pub fn new(app_json: impl Into<String>) -> Self {
        AppFixture {
            config: "[app]\nentry = \"src/app.js\"\n".to_string(),
            app_json: app_json.into(),
            files: vec![(PathBuf::from("src/app.js"), "App({});\n".to_string())],
        }
    }

    /// The two-scope app used throughout the tests: `index` uses `./comp1`
    /// and `sub/a` uses `../../comp1`.
    pub fn shared_component(independent: bool) -> Self {
        let app_json = format!(
            r#"{{ "pages": ["index"], "subPackages": [{{ "root": "sub", "pages": ["a"], "independent": {} }}] }}"#,
            independent
        );
        AppFixture::new(app_json)
            .with_entry("index", &["./comp1"])
            .with_entry("sub/a", &["../../comp1"])
            .with_entry("comp1", &[])
    }

    /// Replace mpbundle.toml.
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    /// Add a file relative to the project root.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Add a page or component below `src/`: a script plus a descriptor
    /// using the given specifiers.
    pub fn with_entry(self, id: &str, specifiers: &[&str]) -> Self {
        let using: Vec<String> = specifiers
            .iter()
            .enumerate()
            .map(|(i, spec)| format!("\"c{}\": \"{}\"", i, spec))
            .collect();
        let descriptor = format!("{{ \"usingComponents\": {{ {} }} }}\n", using.join(", "));

        self.with_file(format!("src/{}.js", id), format!("Page({{ name: '{}' }});\n", id))
            .with_file(format!("src/{}.json", id), descriptor)
    }

    /// Write the fixture below `base_path`.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(base_path.join("src"))?;
        std::fs::write(base_path.join(PROJECT_CONFIG_NAME), &self.config)?;
        std::fs::write(base_path.join("src").join("app.json"), &self.app_json)?;

        for (path, content) in &self.files {
            let full = base_path.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        Ok(base_path.to_path_buf())
    }

    /// Write the fixture into a fresh temporary directory and open it as a
    /// workspace (global config is not consulted).
    pub fn create(&self) -> (TempDir, AppWorkspace) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        self.write_to(tmp.path()).expect("failed to write fixture");
        let config = config::Config::load(&tmp.path().join(PROJECT_CONFIG_NAME))
            .expect("fixture config must parse");
        let workspace = AppWorkspace::new(tmp.path(), config).expect("fixture workspace");
        (tmp, workspace)
    }
}
