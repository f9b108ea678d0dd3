//! Error types for workspace management

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("workspace already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no workspace directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
