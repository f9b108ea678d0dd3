//! CLI command implementations

use anyhow::{Context, bail};
use arbor_core::{PathRef, SourceGraph, Workspace, initialize_workspace};
use arbor_indexer::build_graph;
use arbor_watcher::WatcherService;
use std::path::{Path, PathBuf};

/// Width the `files` listing abbreviates paths to.
const LISTING_WIDTH: usize = 48;

pub fn init(dir: PathBuf) -> anyhow::Result<()> {
    initialize_workspace(&dir)?;
    tracing::info!("Initialized workspace in {}", dir.display());
    Ok(())
}

pub fn files(workspace_dir: &Path, query: Option<&str>) -> anyhow::Result<()> {
    let workspace = Workspace::open(workspace_dir, false)?;
    for file in workspace.find_files(query.unwrap_or("*")) {
        println!("{}", file.abbreviate(LISTING_WIDTH, true));
    }
    Ok(())
}

pub fn index(workspace_dir: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::open(workspace_dir, false)?;
    tracing::info!("Indexing {}", workspace.root_dir().display());

    let graph = build_graph(&workspace)?;
    let external = graph.files().filter(|f| !f.analyzed).count();
    println!(
        "{} files ({} external), {} import edges",
        graph.file_count(),
        external,
        graph.edge_count()
    );
    Ok(())
}

pub fn deps(workspace_dir: &Path, file: &Path) -> anyhow::Result<()> {
    let (graph, target) = load_graph_for(workspace_dir, file)?;
    for edge in graph.outgoing(&target) {
        println!("{}", edge.dest);
    }
    Ok(())
}

pub fn rdeps(workspace_dir: &Path, file: &Path, transitive: bool) -> anyhow::Result<()> {
    let (graph, target) = load_graph_for(workspace_dir, file)?;
    if transitive {
        for path in graph.transitive_dependents(&target) {
            println!("{path}");
        }
    } else {
        for edge in graph.incoming(&target) {
            println!("{}", edge.source);
        }
    }
    Ok(())
}

pub async fn watch(workspace_dir: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::open(workspace_dir, false)?;
    tracing::info!("Watching {}", workspace.root_dir().display());

    let service = WatcherService::new(workspace)?;
    tokio::select! {
        result = service.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopping watcher");
            Ok(())
        }
    }
}

/// Build the graph and find the vertex for a path given on the command line.
fn load_graph_for(workspace_dir: &Path, file: &Path) -> anyhow::Result<(SourceGraph, PathRef)> {
    let workspace = Workspace::open(workspace_dir, false)?;
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let target = PathRef::new(file, &cwd);

    let graph = build_graph(&workspace)?;
    let Some(vertex) = graph.find_file(&target) else {
        bail!("{} is not a source file in the workspace", target.abs().display());
    };
    let target = vertex.path.clone();
    Ok((graph, target))
}
