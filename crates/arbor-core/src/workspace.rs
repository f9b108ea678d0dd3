//! Workspace: the enumerated file set of a project plus its persisted config

use crate::config::{ConfigLoad, EditorOptions, WorkspaceConfig};
use crate::error::{Result, WorkspaceError};
use crate::path::{self, PathRef};
use ignore::WalkBuilder;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Symbol index file inside the workspace directory.
pub const SYMBOL_INDEX: &str = "index.db";

/// Optional custom stylesheet inside the workspace directory.
pub const STYLESHEET: &str = "override.css";

/// Files that appeared or disappeared between two walks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListChange {
    pub removed: BTreeSet<PathRef>,
    pub added: BTreeSet<PathRef>,
}

impl FileListChange {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Callback run after every file list reload. An `Err` is logged and the
/// remaining listeners still run.
pub type FileListener = Box<dyn FnMut(&FileListChange) -> anyhow::Result<()> + Send>;

/// Create an empty workspace directory. Fails if anything exists at `path`.
pub fn initialize_workspace(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(WorkspaceError::AlreadyExists(path.to_path_buf()));
    }
    std::fs::create_dir_all(path).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub struct Workspace {
    workspace_dir: PathBuf,
    files: BTreeSet<PathRef>,
    config: WorkspaceConfig,
    /// False when a config file exists but could not be read, so a setter
    /// never clobbers it.
    config_writable: bool,
    listeners: Vec<FileListener>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("workspace_dir", &self.workspace_dir)
            .field("file_count", &self.files.len())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl Workspace {
    /// Open the workspace stored in `workspace_dir` and walk its root.
    ///
    /// The directory itself is optional unless `must_exist` is set: without
    /// it the config is all defaults and nothing is persisted.
    pub fn open(workspace_dir: impl AsRef<Path>, must_exist: bool) -> Result<Self> {
        let workspace_dir = path::canonicalize(workspace_dir.as_ref());
        if must_exist && !workspace_dir.is_dir() {
            return Err(WorkspaceError::NotFound(workspace_dir));
        }

        let (config, config_writable) = match WorkspaceConfig::load(&workspace_dir) {
            ConfigLoad::Loaded(config) => (config, true),
            ConfigLoad::Missing => (WorkspaceConfig::default(), true),
            ConfigLoad::Failed(reason) => {
                error!(
                    "Failed to read {}: {}",
                    WorkspaceConfig::path(&workspace_dir).display(),
                    reason
                );
                (WorkspaceConfig::default(), false)
            }
        };

        let mut workspace = Workspace {
            workspace_dir,
            files: BTreeSet::new(),
            config,
            config_writable,
            listeners: Vec::new(),
        };
        workspace.reload_file_list();
        Ok(workspace)
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Files and directories found by the last walk.
    pub fn files(&self) -> &BTreeSet<PathRef> {
        &self.files
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Register a listener. Listeners run in registration order.
    pub fn add_file_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&FileListChange) -> anyhow::Result<()> + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Walk the root again, replace the file set and notify every listener
    /// with what changed. Listeners run even when nothing changed.
    pub fn reload_file_list(&mut self) -> FileListChange {
        info!("Loading workspace file list");
        let new_files = self.walk();

        let change = FileListChange {
            removed: self.files.difference(&new_files).cloned().collect(),
            added: new_files.difference(&self.files).cloned().collect(),
        };
        self.files = new_files;
        debug!(
            "File list reloaded: {} files, {} added, {} removed",
            self.files.len(),
            change.added.len(),
            change.removed.len()
        );

        for (i, listener) in self.listeners.iter_mut().enumerate() {
            if let Err(e) = listener(&change) {
                warn!("File listener {} failed: {:#}", i, e);
            }
        }
        change
    }

    /// Top-down walk that never descends into hidden or excluded entries.
    fn walk(&self) -> BTreeSet<PathRef> {
        let root = self.root_dir();
        let excluded: HashSet<String> = self.config.exclude_files.iter().cloned().collect();
        let mut files = BTreeSet::new();

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .hidden(true)
            .follow_links(false);
        builder.filter_entry(move |entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !excluded.contains(name))
        });

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if entry.depth() == 0 {
                        continue;
                    }
                    files.insert(PathRef::new(entry.path(), &root));
                }
                Err(e) => warn!("Failed to read entry under {}: {}", root.display(), e),
            }
        }
        files
    }

    /// Project root. Defaults to the parent of the workspace directory;
    /// a relative configured root is taken relative to the workspace
    /// directory.
    pub fn root_dir(&self) -> PathBuf {
        match &self.config.root_dir {
            Some(root) => path::canonicalize(&self.workspace_dir.join(root)),
            None => self
                .workspace_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.workspace_dir.clone()),
        }
    }

    pub fn set_root_dir(&mut self, root: impl Into<PathBuf>) {
        self.config.root_dir = Some(root.into());
        self.persist_config();
    }

    /// Configured module search path, with relative entries resolved
    /// against the root.
    pub fn python_path(&self) -> Vec<PathBuf> {
        let root = self.root_dir();
        self.config
            .python_path
            .iter()
            .map(|p| path::canonicalize(&root.join(p)))
            .collect()
    }

    pub fn set_python_path(&mut self, entries: Vec<PathBuf>) {
        self.config.python_path = entries;
        self.persist_config();
    }

    /// Directories consulted when resolving a top-level module: the
    /// configured python path, or the root alone when none is configured.
    pub fn module_search_path(&self) -> Vec<PathBuf> {
        let python_path = self.python_path();
        if python_path.is_empty() {
            vec![self.root_dir()]
        } else {
            python_path
        }
    }

    pub fn exclude_files(&self) -> &[String] {
        &self.config.exclude_files
    }

    pub fn set_exclude_files(&mut self, names: Vec<String>) {
        self.config.exclude_files = names;
        self.persist_config();
    }

    pub fn open_files(&self) -> Vec<PathRef> {
        let root = self.root_dir();
        self.config
            .open_files
            .iter()
            .map(|p| PathRef::new(p, &root))
            .collect()
    }

    /// Store the open files as paths relative to the current root.
    pub fn set_open_files(&mut self, files: &[PathRef]) {
        let root = self.root_dir();
        self.config.open_files = files
            .iter()
            .map(|p| {
                PathRef::new(p.abs(), &root)
                    .rel()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        self.persist_config();
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions::with_overrides(&self.config.editor_options)
    }

    pub fn set_editor_option(&mut self, key: impl Into<String>, value: Value) {
        self.config.editor_options.insert(key.into(), value);
        self.persist_config();
    }

    pub fn symbol_index(&self) -> PathRef {
        PathRef::new(self.workspace_dir.join(SYMBOL_INDEX), self.root_dir())
    }

    /// Contents of the custom stylesheet, if one was provided.
    pub fn stylesheet(&self) -> Option<Vec<u8>> {
        let css_path = self.workspace_dir.join(STYLESHEET);
        if !css_path.exists() {
            return None;
        }
        match std::fs::read(&css_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Failed to read {}: {}", css_path.display(), e);
                None
            }
        }
    }

    /// Quick-open filter: non-directory files whose shortest spelling
    /// contains `query`. `*` matches everything and an empty query matches
    /// nothing.
    pub fn find_files(&self, query: &str) -> Vec<&PathRef> {
        if query.is_empty() {
            return Vec::new();
        }
        self.files
            .iter()
            .filter(|p| !p.is_dir())
            .filter(|p| query == "*" || p.shortest().contains(query))
            .collect()
    }

    /// Best-effort write of the config. Skipped when the workspace directory
    /// does not exist, so setters never create it as a side effect.
    fn persist_config(&self) {
        if !self.workspace_dir.is_dir() {
            debug!(
                "No workspace directory at {}, not saving config",
                self.workspace_dir.display()
            );
            return;
        }
        if !self.config_writable {
            warn!("Not saving config: the existing file could not be read");
            return;
        }
        if let Err(e) = self.config.save(&self.workspace_dir) {
            error!(
                "Failed to write {}: {:#}",
                WorkspaceConfig::path(&self.workspace_dir).display(),
                e
            );
        }
    }
}
