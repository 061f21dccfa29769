//! Asset emission.
//!
//! Every entry's sibling files (`<entry>.*`: templates, descriptors, styles
//! already compiled by other tools, images) are copied into the output
//! tree unchanged, together with the configured include globs and the tab
//! bar icons. Scripts and style sources never are: the host bundler owns
//! those.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::entry::normalize;
use crate::core::{AppWorkspace, EntrySet, Origin};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs::{self, relative_path, to_slash};
use crate::util::hash;

/// Style sources compiled by a separate pipeline.
pub const STYLE_SOURCE_EXTENSIONS: &[&str] = &["sass", "scss", "css", "less", "styl"];

/// Asset selection for one application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetPatterns {
    /// Globs relative to the app root
    pub include: Vec<String>,

    /// Globs relative to the project root, for package components
    pub package_include: Vec<String>,

    /// Globs matched against base-relative paths; matches are skipped
    pub ignore: Vec<String>,

    /// Tab bar icons, relative to the app root
    pub tab_bar_icons: Vec<String>,
}

/// One file to copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub source: PathBuf,

    /// Destination relative to the output directory, forward slashes
    pub output: String,
}

/// Outcome of an emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub written: usize,
    pub unchanged: usize,
}

/// Build the include and ignore globs for an application.
pub fn asset_patterns(
    ws: &AppWorkspace,
    entries: &EntrySet,
    tab_bar_icons: &[String],
) -> AssetPatterns {
    let mut patterns = AssetPatterns::default();

    for entry in entries.iter() {
        let glob = format!("{}.*", Pattern::escape(entry.id.as_str()));
        match entry.origin {
            Origin::App => patterns.include.push(glob),
            Origin::Package => patterns.package_include.push(glob),
        }
    }
    patterns
        .include
        .extend(ws.config().assets.include.iter().cloned());

    for ext in ws.config().extensions() {
        patterns.ignore.push(format!("*.{}", ext.trim_start_matches('.')));
    }
    for ext in STYLE_SOURCE_EXTENSIONS {
        patterns.ignore.push(format!("*.{}", ext));
    }
    patterns
        .ignore
        .extend(ws.config().assets.exclude.iter().cloned());

    patterns.tab_bar_icons = tab_bar_icons.iter().map(|icon| normalize(icon)).collect();
    patterns
}

/// Resolve the patterns to concrete files, keyed by output path.
///
/// A tab bar icon that does not exist is reported and left out.
pub fn collect_assets(
    ws: &AppWorkspace,
    patterns: &AssetPatterns,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<Asset>> {
    let ignore = fs::compile_patterns(&patterns.ignore);
    let mut assets: BTreeMap<String, PathBuf> = BTreeMap::new();

    for path in fs::glob_files(ws.app_root(), &patterns.include, &ignore)? {
        let output = to_slash(&relative_path(ws.app_root(), &path));
        assets.insert(output, path);
    }

    let rules = ws.specifier_rules();
    for path in fs::glob_files(ws.project_root(), &patterns.package_include, &ignore)? {
        let rel = to_slash(&relative_path(ws.project_root(), &path));
        assets.insert(rules.package_output_path(&rel), path);
    }

    for icon in &patterns.tab_bar_icons {
        let path = ws.app_root().join(icon);
        if path.is_file() {
            assets.insert(icon.clone(), path);
        } else {
            tracing::debug!("tab bar icon `{}` does not exist", icon);
            diagnostics.push(
                Diagnostic::warning(format!("tab bar icon `{}` does not exist", icon))
                    .with_location(path)
                    .with_suggestion(suggestions::MISSING_ICON),
            );
        }
    }

    Ok(assets
        .into_iter()
        .map(|(output, source)| Asset { source, output })
        .collect())
}

/// Copy assets below `out_dir`, skipping files whose content is unchanged.
///
/// An asset that cannot be read is reported and skipped; a failed write
/// stops the emission.
pub fn emit_assets(
    assets: &[Asset],
    out_dir: &Path,
    progress: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<EmitReport> {
    let reads: Vec<(&Asset, std::io::Result<Vec<u8>>)> = assets
        .par_iter()
        .map(|asset| (asset, std::fs::read(&asset.source)))
        .collect();

    let mut contents = Vec::with_capacity(reads.len());
    for (asset, read) in reads {
        match read {
            Ok(bytes) => contents.push((asset, bytes)),
            Err(err) => diagnostics.push(
                Diagnostic::warning(format!("failed to read asset `{}`", asset.output))
                    .with_location(&asset.source)
                    .with_context(err.to_string()),
            ),
        }
    }

    let pb = if progress && contents.len() > 1 {
        let pb = ProgressBar::new(contents.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let mut report = EmitReport::default();
    for (asset, bytes) in contents {
        let dest = out_dir.join(&asset.output);
        if hash::is_up_to_date(&dest, &bytes) {
            report.unchanged += 1;
        } else {
            fs::write_bytes(&dest, &bytes)
                .with_context(|| format!("failed to write asset `{}`", asset.output))?;
            report.written += 1;
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    tracing::info!(
        "copied {} asset(s), {} unchanged",
        report.written,
        report.unchanged
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::resolve::resolve_app;
    use crate::test_support::AppFixture;
    use tempfile::TempDir;

    fn fixture() -> AppFixture {
        AppFixture::new(
            r#"{ "pages": ["pages/index"], "tabBar": { "list": [{ "iconPath": "/icons/home.png" }] } }"#,
        )
        .with_entry("pages/index", &["/npm-components/ui/button"])
        .with_file("src/pages/index.wxml", "<view/>")
        .with_file("src/pages/index.scss", "view {}")
        .with_file("src/pages/index.wxss", "view {}")
        .with_file("src/icons/home.png", "png")
        .with_file("src/static/logo.svg", "<svg/>")
        .with_file("node_modules/ui/button.js", "Component({});")
        .with_file("node_modules/ui/button.json", "{}")
        .with_file("node_modules/ui/button.wxml", "<button/>")
        .with_config("[app]\nentry = \"src/app.js\"\n\n[assets]\ninclude = [\"static/**/*\"]\n")
    }

    fn outputs(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.output.as_str()).collect()
    }

    #[test]
    fn test_collect_assets() {
        let (_tmp, ws) = fixture().create();
        let resolved = resolve_app(&ws).unwrap();
        let resolution = &resolved.resolution;
        let patterns = asset_patterns(&ws, &resolution.entries, &resolution.tab_bar_assets);
        let mut diagnostics = Vec::new();
        let assets = collect_assets(&ws, &patterns, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());

        assert_eq!(
            outputs(&assets),
            vec![
                "app.json",
                "icons/home.png",
                "npm-components/ui/button.json",
                "npm-components/ui/button.wxml",
                "pages/index.json",
                "pages/index.wxml",
                "pages/index.wxss",
                "static/logo.svg",
            ]
        );
    }

    #[test]
    fn test_ignore_patterns() {
        let (_tmp, ws) = fixture().create();
        let patterns = asset_patterns(&ws, &EntrySet::new(), &[]);
        assert!(patterns.ignore.contains(&"*.js".to_string()));
        assert!(patterns.ignore.contains(&"*.ts".to_string()));
        assert!(patterns.ignore.contains(&"*.less".to_string()));
    }

    #[test]
    fn test_emit_skips_unchanged() {
        let (_tmp, ws) = fixture().create();
        let resolved = resolve_app(&ws).unwrap();
        let resolution = &resolved.resolution;
        let patterns = asset_patterns(&ws, &resolution.entries, &resolution.tab_bar_assets);
        let mut diagnostics = Vec::new();
        let assets = collect_assets(&ws, &patterns, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        let out = TempDir::new().unwrap();

        let first = emit_assets(&assets, out.path(), false, &mut diagnostics).unwrap();
        assert_eq!(first.written, assets.len());
        assert_eq!(
            std::fs::read_to_string(out.path().join("npm-components/ui/button.wxml")).unwrap(),
            "<button/>"
        );

        let second = emit_assets(&assets, out.path(), false, &mut diagnostics).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, assets.len());
    }

    #[test]
    fn test_missing_tab_bar_icon_is_a_warning() {
        let (_tmp, ws) = fixture().create();
        let patterns = AssetPatterns {
            tab_bar_icons: vec!["icons/home.png".into(), "icons/gone.png".into()],
            ..AssetPatterns::default()
        };

        let mut diagnostics = Vec::new();
        let assets = collect_assets(&ws, &patterns, &mut diagnostics).unwrap();
        assert_eq!(outputs(&assets), vec!["icons/home.png"]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_warning());
        assert!(diagnostics[0].message.contains("icons/gone.png"));
    }

    #[test]
    fn test_unreadable_asset_is_skipped() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("a.wxml"), "<view/>").unwrap();
        let assets = vec![
            Asset {
                source: src.path().join("a.wxml"),
                output: "a.wxml".into(),
            },
            Asset {
                source: src.path().join("gone.wxml"),
                output: "gone.wxml".into(),
            },
        ];
        let out = TempDir::new().unwrap();

        let mut diagnostics = Vec::new();
        let report = emit_assets(&assets, out.path(), false, &mut diagnostics).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("gone.wxml"));
        assert!(out.path().join("a.wxml").is_file());
        assert!(!out.path().join("gone.wxml").exists());
    }
}
