//! Arbor Core — paths, workspace model, and the source dependency graph

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod path;
pub mod workspace;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{CONFIG_FILE, EditorOptions, WorkspaceConfig};
pub use error::{Result, WorkspaceError};
pub use graph::SourceGraph;
pub use model::{Edge, EdgeKind, FileKind, SourceFile};
pub use path::PathRef;
pub use workspace::{FileListChange, FileListener, Workspace, initialize_workspace};
