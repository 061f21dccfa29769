//! Dependency graph resolution.
//!
//! Walks the manifest's pages, sub-packages and every `usingComponents`
//! reference reachable from them, producing a deduplicated [`EntrySet`] in
//! discovery order.
//!
//! The walk is a depth-first pre-order traversal driven by an explicit
//! stack, so deep component chains never grow the call stack. Descriptor
//! reads are the only I/O; they are prefetched in parallel for each batch of
//! newly discovered entries, but results are consumed (and diagnostics
//! reported) in traversal order, so the outcome is deterministic.

pub mod descriptor;
pub mod errors;

pub use descriptor::{FsUsageReader, UsageReader};
pub use errors::DescriptorError;

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::core::workspace::APP_ENTRY_ID;
use crate::core::{
    AppManifest, AppWorkspace, EntryId, EntryKind, EntryRef, EntrySet, Origin, Scope, ScopeId,
    SpecifierRules, UsageDescriptor,
};
use crate::util::diagnostic::Diagnostic;

/// Result of resolving an application.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Every page, the root app and every reachable component
    pub entries: EntrySet,

    /// Tab-bar icon paths (relative to the app root)
    pub tab_bar_assets: Vec<String>,

    /// Recovered errors
    pub diagnostics: Vec<Diagnostic>,
}

/// A compile entry point handed to the host bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub id: EntryId,
    pub output: String,
    pub script: PathBuf,
}

/// Resolve an application using the workspace's specifier rules.
pub fn resolve(
    workspace: &AppWorkspace,
    manifest: &AppManifest,
    reader: &dyn UsageReader,
) -> Resolution {
    resolve_with_rules(manifest, &workspace.specifier_rules(), reader)
}

/// Resolve an application.
pub fn resolve_with_rules(
    manifest: &AppManifest,
    rules: &SpecifierRules,
    reader: &dyn UsageReader,
) -> Resolution {
    let mut entries = seed_entries(manifest);
    let mut diagnostics = Vec::new();

    let seeds: Vec<EntryRef> = entries.iter().filter(|e| e.is_root_kind()).cloned().collect();
    let mut traversal = Traversal {
        rules,
        reader,
        prefetched: HashMap::new(),
    };
    traversal.prefetch(&seeds);

    for seed in seeds {
        traversal.walk(seed, &mut entries, &mut diagnostics);
    }

    tracing::info!(
        "resolved {} entries ({} pages, {} components) in {} scope(s)",
        entries.len(),
        entries.pages().count(),
        entries.components().count(),
        entries.scopes().count()
    );

    Resolution {
        entries,
        tab_bar_assets: manifest.tab_bar_icons(),
        diagnostics,
    }
}

/// Root-scope pages, then each sub-package's pages, then the root app.
fn seed_entries(manifest: &AppManifest) -> EntrySet {
    let mut entries = EntrySet::new();

    for page in &manifest.pages {
        insert_page(&mut entries, EntryId::new(page), ScopeId::ROOT);
    }

    for sub in &manifest.subpackages {
        let scope = Scope::subpackage(&sub.root, sub.independent);
        let qualified: Vec<EntryId> = sub
            .pages
            .iter()
            .map(|p| EntryId::new(scope.qualify(p)))
            .collect();
        let scope_id = entries.add_scope(scope);
        for id in qualified {
            insert_page(&mut entries, id, scope_id);
        }
    }

    entries.insert(EntryRef::new(
        EntryId::new(APP_ENTRY_ID),
        EntryKind::RootApp,
        ScopeId::ROOT,
    ));

    entries
}

fn insert_page(entries: &mut EntrySet, id: EntryId, scope: ScopeId) {
    if !entries.insert(EntryRef::new(id.clone(), EntryKind::Page, scope)) {
        tracing::debug!("page `{}` declared more than once", id);
    }
}

/// One open entry on the traversal stack.
struct Frame {
    id: EntryId,
    children: Vec<(EntryId, Origin)>,
    next: usize,
}

type ReadResult = Result<Option<UsageDescriptor>, DescriptorError>;

/// Traversal state, owned by a single `resolve` call.
struct Traversal<'a> {
    rules: &'a SpecifierRules,
    reader: &'a dyn UsageReader,
    prefetched: HashMap<EntryId, ReadResult>,
}

impl Traversal<'_> {
    /// Walk everything reachable from `seed` in depth-first pre-order.
    fn walk(&mut self, seed: EntryRef, entries: &mut EntrySet, diagnostics: &mut Vec<Diagnostic>) {
        let mut stack = vec![self.open(&seed, entries, diagnostics)];

        while let Some(frame) = stack.last_mut() {
            let Some((child_id, origin)) = frame.children.get(frame.next).cloned() else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.id.clone();

            if entries.contains(&child_id) {
                entries.add_edge(&parent, &child_id);
                continue;
            }

            let scope = entries.scope_for_component(&child_id, origin);
            let child = EntryRef {
                output: self.rules.output_name(&child_id, origin),
                id: child_id,
                kind: EntryKind::Component,
                scope,
                origin,
            };
            tracing::debug!("discovered component `{}` (from `{}`)", child.id, parent);
            entries.insert(child.clone());
            entries.add_edge(&parent, &child.id);

            let frame = self.open(&child, entries, diagnostics);
            stack.push(frame);
        }
    }

    /// Read an entry's descriptor and resolve its specifiers.
    fn open(
        &mut self,
        entry: &EntryRef,
        entries: &EntrySet,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Frame {
        let read = match self.prefetched.remove(&entry.id) {
            Some(read) => read,
            None => self.reader.read_usages(entry),
        };

        let descriptor = match read {
            Ok(descriptor) => descriptor.unwrap_or_default(),
            Err(e) => {
                let diag = e.to_diagnostic(&entry.id);
                tracing::warn!("{}", diag.message);
                diagnostics.push(diag);
                UsageDescriptor::default()
            }
        };

        let mut children = Vec::new();
        for raw in descriptor.specifiers() {
            match self.rules.resolve(entry, raw) {
                Some((id, _)) if id.as_str().is_empty() => {
                    let diag = Diagnostic::warning(format!(
                        "component `{}` in `{}` resolves to the app root",
                        raw, entry.id
                    ))
                    .with_context("the reference was skipped");
                    tracing::warn!("{}", diag.message);
                    diagnostics.push(diag);
                }
                Some(child) => children.push(child),
                None => tracing::debug!("skipping plugin component `{}` in `{}`", raw, entry.id),
            }
        }

        let pending: Vec<EntryRef> = children
            .iter()
            .filter(|(id, _)| !entries.contains(id) && !self.prefetched.contains_key(id))
            .map(|(id, origin)| EntryRef {
                id: id.clone(),
                kind: EntryKind::Component,
                scope: ScopeId::ROOT,
                origin: *origin,
                output: String::new(),
            })
            .collect();
        self.prefetch(&pending);

        Frame {
            id: entry.id.clone(),
            children,
            next: 0,
        }
    }

    /// Read a batch of descriptors on the rayon pool.
    fn prefetch(&mut self, batch: &[EntryRef]) {
        if batch.len() < 2 {
            return;
        }
        let reader = self.reader;
        let results: Vec<ReadResult> = batch.par_iter().map(|e| reader.read_usages(e)).collect();
        for (entry, result) in batch.iter().zip(results) {
            self.prefetched.entry(entry.id.clone()).or_insert(result);
        }
    }
}

/// Entries with a script on disk become compile entry points; pages and
/// components without one are reported and left out.
pub fn entry_points(
    workspace: &AppWorkspace,
    entries: &EntrySet,
) -> (Vec<EntryPoint>, Vec<Diagnostic>) {
    let extensions = workspace.config().extensions();
    let mut points = Vec::new();
    let mut diagnostics = Vec::new();

    for entry in entries.iter() {
        match workspace.script_path(entry) {
            Some(script) => points.push(EntryPoint {
                id: entry.id.clone(),
                output: entry.output.clone(),
                script,
            }),
            None => {
                let diag = errors::missing_script(&entry.id, &extensions)
                    .with_location(workspace.entry_stem(entry));
                tracing::warn!("{}", diag.message);
                diagnostics.push(diag);
            }
        }
    }

    (points, diagnostics)
}
