//! Graph build pipeline: load every file, then link

use crate::resolver::ImportResolver;
use crate::source_file::{Analyzer, LoadMode};
use arbor_core::{PathRef, SourceFile, SourceGraph, Workspace};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Builds a [`SourceGraph`] from a set of files.
///
/// Files are parsed in parallel; linking starts only once every file has
/// been loaded, since an import may resolve to any other file.
#[derive(Debug)]
pub struct GraphBuilder {
    resolver: ImportResolver,
    include_external: bool,
}

impl GraphBuilder {
    pub fn new(resolver: ImportResolver) -> Self {
        GraphBuilder {
            resolver,
            include_external: true,
        }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(ImportResolver::for_workspace(workspace))
    }

    /// Whether resolved imports outside the given files get unanalyzed
    /// vertices of their own. On by default.
    pub fn include_external(mut self, include: bool) -> Self {
        self.include_external = include;
        self
    }

    pub fn resolver(&self) -> &ImportResolver {
        &self.resolver
    }

    pub fn build<'a>(&self, files: impl IntoIterator<Item = &'a PathRef>) -> anyhow::Result<SourceGraph> {
        // Fail early if the grammar cannot be loaded at all.
        let mut analyzer = Analyzer::new(&self.resolver)?;

        let candidates: Vec<&PathRef> = files.into_iter().collect();
        let loaded: Vec<SourceFile> = candidates
            .par_iter()
            .map_init(
                || Analyzer::new(&self.resolver).ok(),
                |analyzer, path| analyzer.as_mut()?.new_file(path, LoadMode::Analyze),
            )
            .flatten()
            .collect();

        let known: HashSet<&Path> = loaded.iter().map(|f| f.path.abs()).collect();
        let external: BTreeSet<PathRef> = if self.include_external {
            loaded
                .iter()
                .flat_map(|f| f.imports.iter())
                .filter(|p| !known.contains(p.abs()))
                .cloned()
                .collect()
        } else {
            BTreeSet::new()
        };

        let mut graph = SourceGraph::new();
        for file in loaded {
            graph.add_file(file);
        }
        for path in &external {
            if let Some(file) = analyzer.new_file(path, LoadMode::External) {
                graph.add_file(file);
            }
        }
        let edges = graph.link();

        tracing::info!(
            "Built source graph: {} files ({} external), {} edges",
            graph.file_count(),
            external.len(),
            edges
        );
        Ok(graph)
    }

    /// Build from the workspace's current file list.
    pub fn build_workspace(&self, workspace: &Workspace) -> anyhow::Result<SourceGraph> {
        self.build(workspace.files())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::test_utils::{create_python_repo, create_repo_with_structure};
    use arbor_core::EdgeKind;

    #[test]
    fn test_build_python_repo() {
        let temp = create_python_repo();
        let workspace = Workspace::open(temp.path().join(".arbor"), false).unwrap();
        let graph = GraphBuilder::for_workspace(&workspace)
            .build_workspace(&workspace)
            .unwrap();

        // app, broken, root/__init__, pkg/__init__, mod, helpers
        assert_eq!(graph.file_count(), 6);

        let root = workspace.root_dir();
        let app = root.join("app.py");
        let deps: BTreeSet<String> = graph
            .outgoing(&app)
            .iter()
            .map(|e| e.dest.rel().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            deps,
            BTreeSet::from([
                "root/__init__.py".to_string(),
                "root/pkg/__init__.py".to_string(),
                "root/pkg/mod.py".to_string(),
            ])
        );
        assert!(graph.outgoing(&app).iter().all(|e| e.kind == EdgeKind::Import));

        let helpers = root.join("root/pkg/helpers.py");
        let importers: Vec<String> = graph
            .dependents(&helpers)
            .iter()
            .map(|f| f.path.basename())
            .collect();
        assert_eq!(importers, vec!["mod.py"]);

        let broken = graph.find_file(root.join("broken.py")).unwrap();
        assert!(broken.imports.is_empty());
        assert!(graph.outgoing(root.join("broken.py")).is_empty());

        assert!(
            graph
                .transitive_dependents(&helpers)
                .iter()
                .any(|p| p.basename() == "app.py")
        );
    }

    #[test]
    fn test_external_vertices() {
        let temp = create_repo_with_structure(&[
            ("project/main.py", "import vendored\n"),
            ("site/vendored.py", "import project_never_parsed\n"),
        ]);
        let project = temp.path().join("project");
        let resolver = ImportResolver::new(
            vec![project.clone(), temp.path().join("site")],
            &project,
        );
        let files = [PathRef::new("main.py", &project)];

        let graph = GraphBuilder::new(resolver).build(&files).unwrap();
        assert_eq!(graph.file_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let vendored = graph.find_file(temp.path().join("site/vendored.py")).unwrap();
        assert!(!vendored.analyzed);
        assert!(!vendored.path.in_workspace());
    }

    #[test]
    fn test_without_external_vertices() {
        let temp = create_repo_with_structure(&[
            ("project/main.py", "import vendored\n"),
            ("site/vendored.py", ""),
        ]);
        let project = temp.path().join("project");
        let resolver = ImportResolver::new(
            vec![project.clone(), temp.path().join("site")],
            &project,
        );
        let files = [PathRef::new("main.py", &project)];

        let graph = GraphBuilder::new(resolver)
            .include_external(false)
            .build(&files)
            .unwrap();
        assert_eq!(graph.file_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.find_file(project.join("main.py")).unwrap().imports.len(), 1);
    }
}
