//! Source graph wrapper using petgraph::StableDiGraph keyed by file path

use crate::model::*;
use crate::path::PathRef;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The dependency graph: one vertex per file, directed edges from importer
/// to imported.
///
/// petgraph keeps both an outgoing and an incoming adjacency list per
/// vertex, so neighbors are cheap to enumerate in either direction.
pub struct SourceGraph {
    inner: StableDiGraph<SourceFile, EdgeKind>,
    by_path: HashMap<PathBuf, NodeIndex>,
}

impl std::fmt::Debug for SourceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceGraph")
            .field("file_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl SourceGraph {
    pub fn new() -> Self {
        SourceGraph {
            inner: StableDiGraph::new(),
            by_path: HashMap::new(),
        }
    }

    /// Add a vertex. A vertex already present for the same path is replaced
    /// (dropping its edges) and returned.
    pub fn add_file(&mut self, file: SourceFile) -> Option<SourceFile> {
        let previous = self.remove_file(file.path.abs());
        let key = file.path.abs().to_path_buf();
        let idx = self.inner.add_node(file);
        self.by_path.insert(key, idx);
        previous
    }

    /// Remove a vertex and every edge touching it.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> Option<SourceFile> {
        let idx = self.by_path.remove(path.as_ref())?;
        self.inner.remove_node(idx)
    }

    /// Find the vertex for a resolved path. Absence is routine: imports
    /// often resolve outside every tracked root.
    pub fn find_file(&self, path: impl AsRef<Path>) -> Option<&SourceFile> {
        let idx = self.by_path.get(path.as_ref())?;
        self.inner.node_weight(*idx)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.by_path.contains_key(path.as_ref())
    }

    /// Total number of vertices.
    pub fn file_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all vertices.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Turn every vertex's resolved imports into `Import` edges. Imports
    /// with no vertex are skipped. Returns the number of edges added;
    /// linking twice adds nothing new.
    pub fn link(&mut self) -> usize {
        let mut pending = Vec::new();
        for source in self.inner.node_indices() {
            let Some(file) = self.inner.node_weight(source) else {
                continue;
            };
            for import in &file.imports {
                let Some(&dest) = self.by_path.get(import.abs()) else {
                    continue;
                };
                if !self.has_edge_between(source, dest, EdgeKind::Import) {
                    pending.push((source, dest));
                }
            }
        }

        let added = pending.len();
        for (source, dest) in pending {
            self.inner.add_edge(source, dest, EdgeKind::Import);
        }
        tracing::debug!("Linked {} import edges", added);
        added
    }

    /// Edges leaving `path`.
    pub fn outgoing(&self, path: impl AsRef<Path>) -> Vec<Edge> {
        self.edges_directed(path.as_ref(), Direction::Outgoing)
    }

    /// Edges arriving at `path`.
    pub fn incoming(&self, path: impl AsRef<Path>) -> Vec<Edge> {
        self.edges_directed(path.as_ref(), Direction::Incoming)
    }

    /// Files `path` imports directly.
    pub fn dependencies(&self, path: impl AsRef<Path>) -> Vec<&SourceFile> {
        self.neighbors(path.as_ref(), Direction::Outgoing)
    }

    /// Files that import `path` directly.
    pub fn dependents(&self, path: impl AsRef<Path>) -> Vec<&SourceFile> {
        self.neighbors(path.as_ref(), Direction::Incoming)
    }

    /// Every file that reaches `path` through a chain of imports, not
    /// including `path` itself unless it sits on a cycle.
    pub fn transitive_dependents(&self, path: impl AsRef<Path>) -> BTreeSet<PathRef> {
        let mut seen = HashSet::new();
        let mut result = BTreeSet::new();
        let Some(&start) = self.by_path.get(path.as_ref()) else {
            return result;
        };
        let mut to_visit = vec![start];

        while let Some(current) = to_visit.pop() {
            for parent in self.inner.neighbors_directed(current, Direction::Incoming) {
                if seen.insert(parent) {
                    if let Some(file) = self.inner.node_weight(parent) {
                        result.insert(file.path.clone());
                    }
                    to_visit.push(parent);
                }
            }
        }

        result
    }

    fn has_edge_between(&self, source: NodeIndex, dest: NodeIndex, kind: EdgeKind) -> bool {
        self.inner
            .edges_directed(source, Direction::Outgoing)
            .any(|e| e.target() == dest && *e.weight() == kind)
    }

    fn edges_directed(&self, path: &Path, direction: Direction) -> Vec<Edge> {
        let Some(&idx) = self.by_path.get(path) else {
            return Vec::new();
        };
        let mut edges: Vec<Edge> = self
            .inner
            .edges_directed(idx, direction)
            .filter_map(|e| {
                let source = self.inner.node_weight(e.source())?;
                let dest = self.inner.node_weight(e.target())?;
                Some(Edge {
                    kind: *e.weight(),
                    source: source.path.clone(),
                    dest: dest.path.clone(),
                })
            })
            .collect();
        edges.sort();
        edges
    }

    fn neighbors(&self, path: &Path, direction: Direction) -> Vec<&SourceFile> {
        let Some(&idx) = self.by_path.get(path) else {
            return Vec::new();
        };
        let mut files: Vec<&SourceFile> = self
            .inner
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.inner.node_weight(n))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        files
    }
}

impl Default for SourceGraph {
    fn default() -> Self {
        Self::new()
    }
}
