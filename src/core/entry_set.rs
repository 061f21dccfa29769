//! Entry Set - the resolved, ordered set of buildable units.
//!
//! Entries are stored in discovery order in a petgraph arena; an edge
//! `a -> b` records that `a`'s descriptor referenced component `b`.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::entry::{EntryId, EntryKind, EntryRef, Origin};
use crate::core::scope::{Scope, ScopeId};

/// Maximum number of reference chains reported for one entry.
const MAX_CHAINS: usize = 32;

/// The resolved entries of one build, grouped by scope.
#[derive(Debug, Clone)]
pub struct EntrySet {
    /// Entries in discovery order (node index == position)
    graph: DiGraph<EntryRef, ()>,

    /// Map from entry id to node
    by_id: HashMap<EntryId, NodeIndex>,

    /// Map from output name to node
    by_output: HashMap<String, NodeIndex>,

    /// Scope table; index 0 is the root application
    scopes: Vec<Scope>,
}

impl EntrySet {
    /// Create an empty set holding only the root scope.
    pub fn new() -> Self {
        EntrySet {
            graph: DiGraph::new(),
            by_id: HashMap::new(),
            by_output: HashMap::new(),
            scopes: vec![Scope::root()],
        }
    }

    /// Register a scope.
    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId(i), s))
    }

    /// Scope owning a component: the first sub-package (in declaration
    /// order) whose root contains the id, otherwise the root scope.
    /// Package components always belong to the root scope.
    pub fn scope_for_component(&self, id: &EntryId, origin: Origin) -> ScopeId {
        if origin == Origin::Package {
            return ScopeId::ROOT;
        }
        self.scope_for_path(id.as_str())
    }

    /// First sub-package scope containing an app-relative path, else root.
    pub fn scope_for_path(&self, path: &str) -> ScopeId {
        self.scopes()
            .skip(1)
            .find(|(_, scope)| scope.contains(path))
            .map(|(id, _)| id)
            .unwrap_or(ScopeId::ROOT)
    }

    /// Insert an entry. Returns false (and changes nothing) if the id is
    /// already present.
    pub fn insert(&mut self, entry: EntryRef) -> bool {
        if self.by_id.contains_key(&entry.id) {
            return false;
        }
        let id = entry.id.clone();
        let output = entry.output.clone();
        let node = self.graph.add_node(entry);
        self.by_id.insert(id, node);
        self.by_output.entry(output).or_insert(node);
        true
    }

    /// Record that `from` referenced `to`. Unknown ids are ignored.
    pub fn add_edge(&mut self, from: &EntryId, to: &EntryId) {
        if let (Some(&from_node), Some(&to_node)) = (self.by_id.get(from), self.by_id.get(to)) {
            if !self.graph.contains_edge(from_node, to_node) {
                self.graph.add_edge(from_node, to_node, ());
            }
        }
    }

    pub fn get(&self, id: &EntryId) -> Option<&EntryRef> {
        self.by_id.get(id).map(|&n| &self.graph[n])
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Look an entry up by output name.
    pub fn by_output(&self, output: &str) -> Option<&EntryRef> {
        self.by_output.get(output).map(|&n| &self.graph[n])
    }

    /// Look an entry up by output name, falling back to its id.
    pub fn lookup(&self, name: &str) -> Option<&EntryRef> {
        self.by_output(name)
            .or_else(|| self.get(&EntryId::new(name)))
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryRef> {
        self.graph.node_weights()
    }

    /// Entry ids in discovery order.
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Entries owned by a scope, in discovery order.
    pub fn entries_in(&self, scope: ScopeId) -> impl Iterator<Item = &EntryRef> {
        self.iter().filter(move |e| e.scope == scope)
    }

    pub fn pages(&self) -> impl Iterator<Item = &EntryRef> {
        self.iter().filter(|e| e.kind == EntryKind::Page)
    }

    pub fn components(&self) -> impl Iterator<Item = &EntryRef> {
        self.iter().filter(|e| e.kind == EntryKind::Component)
    }

    /// Entries whose descriptors reference `id`, in discovery order.
    pub fn referrers(&self, id: &EntryId) -> Vec<&EntryRef> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Components referenced by `id`, in discovery order.
    pub fn references(&self, id: &EntryId) -> Vec<&EntryRef> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &EntryId, dir: Direction) -> Vec<&EntryRef> {
        let Some(&node) = self.by_id.get(id) else {
            return Vec::new();
        };
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(node, dir).collect();
        nodes.sort();
        nodes.into_iter().map(|n| &self.graph[n]).collect()
    }

    /// Reference chains from a page (or the app) down to `id`.
    ///
    /// Each chain ends at `id` and starts at an entry with no referrer
    /// outside the chain. Chains never revisit an entry.
    pub fn reference_chains(&self, id: &EntryId) -> Vec<Vec<EntryId>> {
        let Some(&target) = self.by_id.get(id) else {
            return Vec::new();
        };

        let mut chains = Vec::new();
        let mut stack: Vec<Vec<NodeIndex>> = vec![vec![target]];

        while let Some(path) = stack.pop() {
            if chains.len() >= MAX_CHAINS {
                break;
            }
            let Some(&head) = path.last() else { continue };
            let mut parents: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(head, Direction::Incoming)
                .filter(|p| !path.contains(p))
                .collect();

            if parents.is_empty() {
                chains.push(path.iter().rev().map(|&n| self.graph[n].id.clone()).collect());
                continue;
            }

            // Reverse so the earliest-discovered parent is explored first
            parents.sort();
            for parent in parents.into_iter().rev() {
                let mut next = path.clone();
                next.push(parent);
                stack.push(next);
            }
        }

        chains
    }
}

impl Default for EntrySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, kind: EntryKind, scope: ScopeId) -> EntryRef {
        EntryRef::new(EntryId::new(id), kind, scope)
    }

    #[test]
    fn test_insert_dedups() {
        let mut set = EntrySet::new();
        assert!(set.insert(entry("index", EntryKind::Page, ScopeId::ROOT)));
        assert!(!set.insert(entry("index", EntryKind::Component, ScopeId::ROOT)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&EntryId::new("index")).unwrap().kind, EntryKind::Page);
    }

    #[test]
    fn test_scope_for_component() {
        let mut set = EntrySet::new();
        let sub = set.add_scope(Scope::subpackage("sub", false));
        let sub2 = set.add_scope(Scope::subpackage("sub2", true));

        assert_eq!(set.scope_for_component(&EntryId::new("sub/comp"), Origin::App), sub);
        assert_eq!(set.scope_for_component(&EntryId::new("sub2/comp"), Origin::App), sub2);
        assert_eq!(
            set.scope_for_component(&EntryId::new("components/x"), Origin::App),
            ScopeId::ROOT
        );
        assert_eq!(
            set.scope_for_component(&EntryId::new("sub/x"), Origin::Package),
            ScopeId::ROOT
        );
    }

    #[test]
    fn test_lookup_by_output_or_id() {
        let mut set = EntrySet::new();
        let mut pkg = entry("node_modules/ui/button", EntryKind::Component, ScopeId::ROOT);
        pkg.origin = Origin::Package;
        pkg.output = "npm-components/ui/button".to_string();
        set.insert(pkg);

        assert!(set.lookup("npm-components/ui/button").is_some());
        assert!(set.lookup("node_modules/ui/button").is_some());
        assert!(set.lookup("missing").is_none());
    }

    #[test]
    fn test_referrers_and_chains() {
        let mut set = EntrySet::new();
        set.insert(entry("index", EntryKind::Page, ScopeId::ROOT));
        set.insert(entry("logs", EntryKind::Page, ScopeId::ROOT));
        set.insert(entry("card", EntryKind::Component, ScopeId::ROOT));
        set.insert(entry("icon", EntryKind::Component, ScopeId::ROOT));

        let id = |s: &str| EntryId::new(s);
        set.add_edge(&id("index"), &id("card"));
        set.add_edge(&id("logs"), &id("card"));
        set.add_edge(&id("card"), &id("icon"));
        set.add_edge(&id("icon"), &id("card"));

        let referrers: Vec<&str> = set
            .referrers(&id("card"))
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(referrers, vec!["index", "logs", "icon"]);

        let chains = set.reference_chains(&id("icon"));
        assert_eq!(
            chains,
            vec![
                vec![id("index"), id("card"), id("icon")],
                vec![id("logs"), id("card"), id("icon")],
            ]
        );
    }
}
