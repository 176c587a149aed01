//! Core data model: the article registry, the link graph, and the deltas
//! exchanged between traversal calls.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TermGraphError};

// ---------------------------------------------------------------------------
// ArticleRecord
// ---------------------------------------------------------------------------

/// Where an article lives locally and where it was fetched from.
///
/// Serialized as `{"path": ..., "link": ...}` to stay compatible with
/// registries produced by earlier tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Local content location.
    pub path: PathBuf,
    /// Remote address used to fetch the article.
    #[serde(rename = "link")]
    pub locator: String,
}

impl ArticleRecord {
    pub fn new(path: impl Into<PathBuf>, locator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            locator: locator.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleRegistry
// ---------------------------------------------------------------------------

/// Identifier → [`ArticleRecord`]. The "have we seen this article" ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleRegistry {
    records: BTreeMap<String, ArticleRecord>,
}

impl ArticleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&ArticleRecord> {
        self.records.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    /// Insert or overwrite a record, returning the previous one.
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        record: ArticleRecord,
    ) -> Option<ArticleRecord> {
        self.records.insert(identifier.into(), record)
    }

    /// Merge a delta into this registry. Records in `delta` win.
    pub fn merge(&mut self, delta: ArticleRegistry) {
        self.records.extend(delta.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArticleRecord)> {
        self.records.iter()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    /// Load a registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Write the registry to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

impl FromIterator<(String, ArticleRecord)> for ArticleRegistry {
    fn from_iter<I: IntoIterator<Item = (String, ArticleRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkGraph
// ---------------------------------------------------------------------------

/// Identifier → set of identifiers it references.
///
/// Edges are directed and unweighted. Edge sets are sets, so a node never
/// holds the same target twice no matter how many times it is discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding an empty edge set for every given identifier.
    pub fn with_nodes<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for id in identifiers {
            graph.ensure_node(id);
        }
        graph
    }

    /// Make sure `identifier` has an edge set, even if empty.
    pub fn ensure_node(&mut self, identifier: impl Into<String>) {
        self.edges.entry(identifier.into()).or_default();
    }

    /// Union `targets` into the edge set of `identifier`.
    pub fn add_edges<I, S>(&mut self, identifier: impl Into<String>, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .entry(identifier.into())
            .or_default()
            .extend(targets.into_iter().map(Into::into));
    }

    pub fn edges(&self, identifier: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(identifier)
    }

    pub fn contains_node(&self, identifier: &str) -> bool {
        self.edges.contains_key(identifier)
    }

    /// Union every edge set of `other` into this graph, keyed by identifier.
    /// Existing sets are extended, never replaced.
    pub fn merge(&mut self, other: LinkGraph) {
        for (node, targets) in other.edges {
            self.edges.entry(node).or_default().extend(targets);
        }
    }

    /// Drop empty target names from every edge set.
    pub fn prune_empty(&mut self) {
        for targets in self.edges.values_mut() {
            targets.retain(|t| !t.is_empty());
        }
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

// ---------------------------------------------------------------------------
// OutboundLink / Expansion
// ---------------------------------------------------------------------------

/// A reference found on an article page. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutboundLink {
    /// Display text of the link, used as the target's identifier.
    pub display_name: String,
    /// Target address (absolute once resolved by the engine).
    pub locator: String,
    /// Related-term link (`true`) or related-article card (`false`).
    pub is_term: bool,
}

impl OutboundLink {
    pub fn term(display_name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            locator: locator.into(),
            is_term: true,
        }
    }

    pub fn article(display_name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            locator: locator.into(),
            is_term: false,
        }
    }
}

/// Partial registry/graph contribution of one traversal call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Registry entries inserted or overwritten by this call and its children.
    pub articles: ArticleRegistry,
    /// Edges discovered by this call and its children.
    pub graph: LinkGraph,
}

impl Expansion {
    /// Fold a child's contribution into this one.
    pub fn absorb(&mut self, child: Expansion) {
        self.articles.merge(child.articles);
        self.graph.merge(child.graph);
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty() && self.graph.is_empty()
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(TermGraphError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| TermGraphError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| TermGraphError::parse(format!("failed to parse {}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| TermGraphError::io(parent, e))?;
        }
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TermGraphError::parse(format!("failed to serialize {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|e| TermGraphError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_uses_link_key() {
        let json = r#"{"Bond": {"path": "./data/term/Bond.html", "link": "https://x/bond.asp"}}"#;
        let registry: ArticleRegistry = serde_json::from_str(json).expect("parse registry");
        let bond = registry.get("Bond").expect("Bond present");
        assert_eq!(bond.path, PathBuf::from("./data/term/Bond.html"));
        assert_eq!(bond.locator, "https://x/bond.asp");

        let out = serde_json::to_value(&registry).expect("serialize");
        assert_eq!(out["Bond"]["link"], "https://x/bond.asp");
    }

    #[test]
    fn registry_merge_later_wins() {
        let mut base = ArticleRegistry::new();
        base.insert("A", ArticleRecord::new("a.html", "https://x/a-old"));

        let mut delta = ArticleRegistry::new();
        delta.insert("A", ArticleRecord::new("a.html", "https://x/a"));
        delta.insert("B", ArticleRecord::new("b.html", "https://x/b"));

        base.merge(delta);
        assert_eq!(base.len(), 2);
        assert_eq!(base.get("A").unwrap().locator, "https://x/a");
    }

    #[test]
    fn graph_edges_are_unique() {
        let mut graph = LinkGraph::new();
        graph.add_edges("Bond", ["Yield", "Yield", "Coupon"]);
        assert_eq!(graph.edges("Bond").unwrap().len(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn graph_merge_unions_instead_of_overwriting() {
        let mut graph = LinkGraph::with_nodes(["X"]);
        graph.add_edges("X", ["A"]);

        let mut other = LinkGraph::new();
        other.add_edges("X", ["B"]);
        other.add_edges("Y", ["X"]);

        graph.merge(other);
        let x: Vec<_> = graph.edges("X").unwrap().iter().cloned().collect();
        assert_eq!(x, vec!["A".to_string(), "B".to_string()]);
        assert!(graph.contains_node("Y"));
    }

    #[test]
    fn prune_empty_drops_blank_targets_only() {
        let mut graph = LinkGraph::new();
        graph.add_edges("Bond", ["", "Yield", "Yield"]);
        graph.ensure_node("Coupon");

        graph.prune_empty();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges("Bond").unwrap().contains("Yield"));
        assert!(graph.contains_node("Coupon"));
    }

    #[test]
    fn graph_with_nodes_starts_empty() {
        let graph = LinkGraph::with_nodes(["A", "B"]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        let json = serde_json::to_string(&graph).unwrap();
        assert_eq!(json, r#"{"A":[],"B":[]}"#);
    }

    #[test]
    fn expansion_absorb_merges_both_maps() {
        let mut parent = Expansion::default();
        parent.graph.add_edges("Bond", ["Yield"]);

        let mut child = Expansion::default();
        child
            .articles
            .insert("Yield", ArticleRecord::new("term/Yield.html", "https://x/yield.asp"));
        child.graph.add_edges("Yield", ["Coupon"]);
        child.graph.add_edges("Bond", ["Coupon"]);

        parent.absorb(child);
        assert!(parent.articles.contains("Yield"));
        assert_eq!(parent.graph.edges("Bond").unwrap().len(), 2);
        assert_eq!(parent.graph.node_count(), 2);
    }

    #[test]
    fn load_missing_file_is_missing_input() {
        let path = std::env::temp_dir().join(format!(
            "tg-missing-{}/article_map.json",
            uuid::Uuid::now_v7()
        ));
        let err = ArticleRegistry::load(&path).unwrap_err();
        assert!(err.is_missing_input());
    }

    #[test]
    fn save_and_load_registry_file() {
        let dir = std::env::temp_dir().join(format!("tg-registry-{}", uuid::Uuid::now_v7()));
        let path = dir.join("nested").join("article_map.json");

        let mut registry = ArticleRegistry::new();
        registry.insert("Bond", ArticleRecord::new("data/b/bond.html", "https://x/bond.asp"));
        registry.save(&path).expect("save");

        let loaded = ArticleRegistry::load(&path).expect("load");
        assert_eq!(loaded, registry);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
