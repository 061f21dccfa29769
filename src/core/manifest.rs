//! Application manifest (`app.json`) and component descriptors.
//!
//! Only the consumed fields are modelled; everything else in the files is
//! ignored. Missing optional fields default to empty.

use std::fmt;
use std::path::Path;

use miette::{NamedSource, SourceSpan};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::core::workspace::ConfigError;

/// The parsed `app.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppManifest {
    /// Root-scope pages, in declaration order
    pub pages: Vec<String>,

    /// Sub-package declarations
    #[serde(alias = "subPackages")]
    pub subpackages: Vec<SubPackage>,

    /// Tab bar, whose icons are copied as assets
    #[serde(rename = "tabBar")]
    pub tab_bar: Option<TabBar>,
}

/// A sub-package declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubPackage {
    /// Sub-package root directory, relative to the app root
    pub root: String,

    /// Pages, relative to the sub-package root
    pub pages: Vec<String>,

    /// Whether the sub-package may share nothing with other scopes
    pub independent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TabBar {
    pub list: Vec<TabBarItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TabBarItem {
    #[serde(rename = "iconPath")]
    pub icon_path: Option<String>,

    #[serde(rename = "selectedIconPath")]
    pub selected_icon_path: Option<String>,
}

impl AppManifest {
    /// Load and parse `app.json`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ManifestUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse manifest text; `name` labels the source in error reports.
    pub fn parse(contents: &str, name: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| {
            let offset = line_col_offset(contents, e.line(), e.column());
            ConfigError::ManifestMalformed {
                message: e.to_string(),
                src: NamedSource::new(name, contents.to_string()),
                span: SourceSpan::from(offset),
            }
        })
    }

    /// Distinct tab-bar icon paths in declaration order, normal icon before
    /// selected icon.
    pub fn tab_bar_icons(&self) -> Vec<String> {
        let mut icons: Vec<String> = Vec::new();
        let items = self.tab_bar.iter().flat_map(|t| t.list.iter());
        for item in items {
            for icon in [&item.icon_path, &item.selected_icon_path].into_iter().flatten() {
                if !icon.is_empty() && !icons.contains(icon) {
                    icons.push(icon.clone());
                }
            }
        }
        icons
    }
}

/// Byte offset of a 1-based line/column position reported by serde_json.
fn line_col_offset(contents: &str, line: usize, column: usize) -> usize {
    let line_start: usize = contents
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(contents.len())
}

/// A component descriptor (`<entry>.json`): the `usingComponents` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UsageDescriptor {
    #[serde(rename = "usingComponents")]
    pub using_components: UsingComponents,
}

impl UsageDescriptor {
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Specifiers in authored order.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.using_components.0.iter().map(|(_, spec)| spec.as_str())
    }
}

/// Ordered `name -> specifier` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsingComponents(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for UsingComponents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = UsingComponents;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of component names to specifiers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some((name, spec)) = map.next_entry::<String, String>()? {
                    pairs.push((name, spec));
                }
                Ok(UsingComponents(pairs))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
