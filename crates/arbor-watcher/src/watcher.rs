//! Filesystem watcher implementation

use anyhow::Result;
use arbor_core::{FileKind, FileListChange, SourceGraph, Workspace};
use arbor_indexer::GraphBuilder;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// How long to keep collecting events after the first one of a batch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File or directory created
    Created(PathBuf),
    /// File or directory modified
    Modified(PathBuf),
    /// File or directory removed
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

/// Decides which paths under a root are worth reacting to. Mirrors the
/// workspace walk: hidden entries and excluded basenames are skipped at
/// any depth.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    exclude: HashSet<String>,
}

impl PathFilter {
    pub fn new(root: impl Into<PathBuf>, exclude: impl IntoIterator<Item = String>) -> Self {
        PathFilter {
            root: root.into(),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(workspace.root_dir(), workspace.exclude_files().iter().cloned())
    }

    /// Hidden entries only. The exclusion list can change while watching,
    /// so it is applied per batch instead.
    pub fn hidden_only(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Vec::new())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True for paths outside the root and for anything below a hidden or
    /// excluded entry.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return true;
        };
        rel.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.') || self.exclude.contains(name.as_ref())
            }
            _ => false,
        })
    }
}

/// File system watcher for a project root
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    watched_paths: HashSet<PathBuf>,
    root_path: PathBuf,
}

impl FileWatcher {
    /// Create a watcher whose events are pre-filtered by `filter`. Nothing is
    /// watched until [`FileWatcher::watch_directory`] is called.
    pub fn new(filter: PathFilter) -> Result<Self> {
        let root_path = filter.root().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    debug!("File system event: {:?}", event);
                    Self::handle_notify_event(event, &filter, &event_tx);
                }
                Err(e) => {
                    error!("File system watch error: {}", e);
                }
            }
        })?;

        Ok(Self {
            watcher,
            event_rx,
            watched_paths: HashSet::new(),
            root_path,
        })
    }

    /// Convert a notify event into watch events, dropping ignored paths
    fn handle_notify_event(
        event: notify::Event,
        filter: &PathFilter,
        event_tx: &mpsc::UnboundedSender<WatchEvent>,
    ) {
        let make: fn(PathBuf) -> WatchEvent = match event.kind {
            notify::EventKind::Create(_) => WatchEvent::Created,
            notify::EventKind::Modify(_) => WatchEvent::Modified,
            notify::EventKind::Remove(_) => WatchEvent::Removed,
            _ => return,
        };
        for path in event.paths {
            if filter.should_ignore(&path) {
                continue;
            }
            if let Err(e) = event_tx.send(make(path)) {
                warn!("Failed to forward watch event: {}", e);
            }
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Watch a directory recursively
    pub fn watch_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching directory: {:?}", path);

        self.watcher.watch(path, RecursiveMode::Recursive)?;
        self.watched_paths.insert(path.to_path_buf());
        Ok(())
    }

    /// Stop watching a path
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Stopping watch for: {:?}", path);

        self.watcher.unwatch(path)?;
        self.watched_paths.remove(path);
        Ok(())
    }

    /// Get the event receiver
    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched_paths.contains(path)
    }
}

/// Keeps a workspace file list and its source graph in step with the disk.
///
/// Each debounced batch of events triggers one file list reload and, when
/// a source file may have changed, one graph rebuild.
pub struct WatcherService {
    watcher: Arc<RwLock<FileWatcher>>,
    workspace: Arc<Mutex<Workspace>>,
    graph: Arc<RwLock<SourceGraph>>,
    change_tx: Option<broadcast::Sender<FileListChange>>,
    debounce: Duration,
}

impl WatcherService {
    /// Take ownership of the workspace and build its initial graph.
    pub fn new(workspace: Workspace) -> Result<Self> {
        let watcher = FileWatcher::new(PathFilter::hidden_only(workspace.root_dir()))?;
        let graph = GraphBuilder::for_workspace(&workspace).build_workspace(&workspace)?;
        Ok(Self {
            watcher: Arc::new(RwLock::new(watcher)),
            workspace: Arc::new(Mutex::new(workspace)),
            graph: Arc::new(RwLock::new(graph)),
            change_tx: None,
            debounce: DEFAULT_DEBOUNCE,
        })
    }

    /// Also publish every file list change on `change_tx`.
    pub fn with_broadcast(mut self, change_tx: broadcast::Sender<FileListChange>) -> Self {
        self.change_tx = Some(change_tx);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn graph(&self) -> Arc<RwLock<SourceGraph>> {
        Arc::clone(&self.graph)
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        Arc::clone(&self.workspace)
    }

    /// Start watching the project root
    pub async fn start_watching(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let root_path = watcher.root_path().to_path_buf();
        watcher.watch_directory(&root_path)?;

        info!("Started watching project directory: {:?}", root_path);
        Ok(())
    }

    /// Process file system events until the watcher shuts down
    pub async fn process_events(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let event_rx = watcher.event_receiver();

        while let Some(first) = event_rx.recv().await {
            tokio::time::sleep(self.debounce).await;
            let mut batch = vec![first];
            while let Ok(event) = event_rx.try_recv() {
                batch.push(event);
            }
            debug!("Processing {} watch events", batch.len());

            let paths: Vec<PathBuf> = batch.iter().map(|e| e.path().to_path_buf()).collect();
            self.apply_changes(&paths).await;
        }

        Ok(())
    }

    /// Reload the file list and rebuild the graph for a batch of changed
    /// paths. Returns `None` when every path was ignored.
    ///
    /// The file list change is published even if the rebuild fails; the
    /// previous graph is kept in that case.
    pub async fn apply_changes(&self, paths: &[PathBuf]) -> Option<FileListChange> {
        let mut workspace = self.workspace.lock().await;
        let filter = PathFilter::for_workspace(&workspace);
        let relevant: Vec<&PathBuf> = paths.iter().filter(|p| !filter.should_ignore(p)).collect();
        if relevant.is_empty() {
            return None;
        }

        let change = workspace.reload_file_list();
        if let Some(ref change_tx) = self.change_tx {
            // No subscribers is fine.
            let _ = change_tx.send(change.clone());
        }

        let touches_source = relevant
            .iter()
            .any(|p| FileKind::from_path(p) == FileKind::PythonSource);
        if change.is_empty() && !touches_source {
            debug!("No source changes in batch of {} paths", relevant.len());
            return Some(change);
        }

        match GraphBuilder::for_workspace(&workspace).build_workspace(&workspace) {
            Ok(rebuilt) => {
                let mut graph = self.graph.write().await;
                *graph = rebuilt;
                info!(
                    "Workspace changed: {} added, {} removed; graph has {} files, {} edges",
                    change.added.len(),
                    change.removed.len(),
                    graph.file_count(),
                    graph.edge_count()
                );
            }
            Err(e) => error!("Failed to rebuild source graph, keeping the old one: {:#}", e),
        }
        Some(change)
    }

    /// Watch the root and process events until the watcher shuts down.
    pub async fn run(&self) -> Result<()> {
        self.start_watching().await?;
        self.process_events().await
    }
}
