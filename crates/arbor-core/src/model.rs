//! Core data structures for the dependency graph

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::path::PathRef;

/// What kind of relationship an edge represents. Only `Import` is produced
/// by the indexer today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Declare,
    Refer,
    Call,
}

/// A directed edge between two files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source: PathRef,
    pub dest: PathRef,
}

/// Classification of a file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// `.py` source, parsed for imports.
    PythonSource,
    /// Byte-compiled cache files. Never analyzed on their own.
    PythonCompiled,
    Other,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => FileKind::PythonSource,
            Some("pyc") | Some("pyo") => FileKind::PythonCompiled,
            _ => FileKind::Other,
        }
    }
}

/// A vertex of the source graph: one file and the files it imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathRef,
    /// Resolved import targets. Empty when the file failed to parse or was
    /// added without analysis.
    pub imports: BTreeSet<PathRef>,
    /// False for vertices that only exist as edge destinations.
    pub analyzed: bool,
}

impl SourceFile {
    pub fn analyzed(path: PathRef, imports: BTreeSet<PathRef>) -> Self {
        SourceFile {
            path,
            imports,
            analyzed: true,
        }
    }

    /// A vertex for a file outside the workspace that is never parsed.
    pub fn external(path: PathRef) -> Self {
        SourceFile {
            path,
            imports: BTreeSet::new(),
            analyzed: false,
        }
    }
}
