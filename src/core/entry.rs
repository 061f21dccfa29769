//! Buildable units: pages, components and the application bootstrap.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::scope::ScopeId;

/// Scope-qualified path of an entry, relative to the app root (or to the
/// project root for package components), forward slashes, no extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create an id from a path, normalizing it lexically.
    pub fn new(path: impl AsRef<str>) -> Self {
        EntryId(normalize(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory part of the id (`pages/index/index` -> `pages/index`).
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// Resolve a relative reference against this entry's directory.
    pub fn join_relative(&self, reference: &str) -> EntryId {
        let dir = self.dir();
        if dir.is_empty() {
            EntryId::new(reference)
        } else {
            EntryId::new(format!("{}/{}", dir, reference))
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a path lexically: forward slashes, no `.` segments, no empty
/// segments, `..` applied. A `..` that would climb above the root is dropped.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// What kind of unit an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A page declared in the manifest
    Page,
    /// A component discovered through `usingComponents`
    Component,
    /// The synthetic application bootstrap (`app`)
    RootApp,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Page => write!(f, "page"),
            EntryKind::Component => write!(f, "component"),
            EntryKind::RootApp => write!(f, "app"),
        }
    }
}

/// Which directory an entry id is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Relative to the app root (the directory holding app.json)
    App,
    /// Relative to the project root (installed package components)
    Package,
}

/// One buildable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    /// Canonical id, unique across the entry set
    pub id: EntryId,

    /// Entry kind
    pub kind: EntryKind,

    /// Owning scope
    pub scope: ScopeId,

    /// Base directory the id is relative to
    pub origin: Origin,

    /// Bundle name the host bundler emits this entry under
    pub output: String,
}

impl EntryRef {
    /// Create an app-relative entry whose output name equals its id.
    pub fn new(id: EntryId, kind: EntryKind, scope: ScopeId) -> Self {
        let output = id.as_str().to_string();
        EntryRef {
            id,
            kind,
            scope,
            origin: Origin::App,
            output,
        }
    }

    /// Pages and the root app seed the component walk.
    pub fn is_root_kind(&self) -> bool {
        matches!(self.kind, EntryKind::Page | EntryKind::RootApp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("pages/./index/../index"), "pages/index");
        assert_eq!(normalize("/components/card"), "components/card");
        assert_eq!(normalize("pages\\index\\index"), "pages/index/index");
        assert_eq!(normalize("sub/../../comp1"), "comp1");
    }

    #[test]
    fn test_entry_id_dir() {
        assert_eq!(EntryId::new("pages/index/index").dir(), "pages/index");
        assert_eq!(EntryId::new("index").dir(), "");
    }

    #[test]
    fn test_join_relative() {
        let page = EntryId::new("pages/index/index");
        assert_eq!(
            page.join_relative("../../components/card/card").as_str(),
            "components/card/card"
        );
        assert_eq!(page.join_relative("./item").as_str(), "pages/index/item");

        let top = EntryId::new("index");
        assert_eq!(top.join_relative("./comp1").as_str(), "comp1");
    }

    #[test]
    fn test_join_relative_clamps_at_root() {
        let sub_page = EntryId::new("sub/a");
        assert_eq!(sub_page.join_relative("../../comp1").as_str(), "comp1");
    }
}
