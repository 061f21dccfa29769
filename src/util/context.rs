//! Global context for mpbundle operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! configuration directory and the terminal settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::ConfigError;
use crate::util::config::{self, Config, PROJECT_CONFIG_NAME};

/// Global context containing configuration paths and terminal settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global mpbundle data (~/.mpbundle/)
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = config::global_config_dir().unwrap_or_else(|| PathBuf::from(".mpbundle"));

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Find `mpbundle.toml` starting from cwd and searching upward.
    pub fn find_project_config(&self) -> Result<PathBuf, ConfigError> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(PROJECT_CONFIG_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ConfigError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }

    /// Find the project root (directory containing mpbundle.toml).
    pub fn find_project_root(&self) -> Result<PathBuf, ConfigError> {
        self.find_project_config().map(|p| {
            p.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.cwd.clone())
        })
    }

    /// Load the merged global + project configuration.
    pub fn load_config(&self, project_root: &Path) -> Config {
        config::load_config(&self.config_path(), &project_root.join(PROJECT_CONFIG_NAME))
    }
}
