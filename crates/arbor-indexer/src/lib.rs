//! Python import analysis and dependency graph construction

pub mod builder;
pub mod error;
pub mod imports;
pub mod parser;
pub mod resolver;
pub mod source_file;


pub use builder::GraphBuilder;
pub use error::{LoadError, ParseError, ResolveError};
pub use imports::{ImportStatement, collect_imports};
pub use parser::PythonParser;
pub use resolver::{FsModuleFinder, ImportResolver, ModuleFinder, ModuleLocation, PACKAGE_INIT};
pub use source_file::{Analyzer, LoadMode};

use arbor_core::{SourceGraph, Workspace};

/// Build the dependency graph of every file in the workspace, resolving
/// imports against its module search path.
pub fn build_graph(workspace: &Workspace) -> anyhow::Result<SourceGraph> {
    GraphBuilder::for_workspace(workspace).build_workspace(workspace)
}
