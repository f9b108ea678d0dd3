//! Keeps a workspace and its source graph current as files change

pub mod watcher;

pub use watcher::{DEFAULT_DEBOUNCE, FileWatcher, PathFilter, WatchEvent, WatcherService};
