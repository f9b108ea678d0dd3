//! Error types for parsing and import resolution

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A source file could not be turned into a syntax tree.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to set parser language: {0}")]
    Language(String),

    #[error("parser produced no tree")]
    NoTree,

    #[error("invalid syntax at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// A dotted module name could not be located on the search path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid module name {0:?}")]
    InvalidName(String),

    #[error("no module named {segment:?} while resolving {module:?}")]
    NotFound { module: String, segment: String },

    #[error("{module:?}: {} is a module, not a package", file.display())]
    NotAPackage { module: String, file: PathBuf },

    #[error("relative import climbs above {}", .0.display())]
    BeyondTopLevel(PathBuf),
}

/// Why a file contributed no imports.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}
