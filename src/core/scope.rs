//! Code-sharing scopes.
//!
//! The root application is one scope and every sub-package is another.
//! Scopes are flat: a sub-package root never nests inside another.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a scope inside an [`EntrySet`](crate::core::EntrySet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// The root application scope, always present.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn is_root(self) -> bool {
        self == ScopeId::ROOT
    }
}

/// A partition boundary for code sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Sub-package root path, or "" for the root application
    pub name: String,

    /// Whether this scope may share nothing with any other scope
    pub independent: bool,
}

impl Scope {
    /// The root application scope.
    pub fn root() -> Self {
        Scope {
            name: String::new(),
            independent: false,
        }
    }

    /// A sub-package scope; the root path is normalized to forward slashes
    /// without leading or trailing separators.
    pub fn subpackage(root: &str, independent: bool) -> Self {
        Scope {
            name: root
                .replace('\\', "/")
                .trim_matches('/')
                .to_string(),
            independent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Join a path below this scope's root (`sub` + `pages/a` = `sub/pages/a`).
    pub fn qualify(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.name.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.name, path)
        }
    }

    /// Whether an app-relative path lies under this scope's root.
    ///
    /// Containment is per path segment: `subpkg2/x` is not under `subpkg`.
    /// The root scope contains everything.
    pub fn contains(&self, path: &str) -> bool {
        if self.name.is_empty() {
            return true;
        }
        let path = path.trim_start_matches('/');
        path == self.name
            || (path.starts_with(&self.name) && path[self.name.len()..].starts_with('/'))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "(root)")
        } else if self.independent {
            write!(f, "{} (independent)", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
