//! Loading source files into graph vertices

use crate::error::{LoadError, ResolveError};
use crate::imports::{ImportStatement, collect_imports};
use crate::parser::PythonParser;
use crate::resolver::ImportResolver;
use arbor_core::{FileKind, PathRef, SourceFile};
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

const FUTURE_MODULE: &str = "__future__";

/// Whether a new vertex gets its imports analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Parse the file and resolve its imports.
    Analyze,
    /// Vertex for a file outside the workspace: never parsed, only an
    /// edge destination.
    External,
}

/// Why a name is being resolved. Decides whether a failure is worth
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameOrigin {
    /// Named by `import X` or as the module of `from X import ...`.
    Module,
    /// `Y` in `from X import Y`, which may be a class or function rather
    /// than a submodule.
    MaybeAttribute,
}

/// Turns files into [`SourceFile`] vertices. Holds a parser, so use one per
/// thread.
pub struct Analyzer<'r> {
    parser: PythonParser,
    resolver: &'r ImportResolver,
}

impl<'r> Analyzer<'r> {
    pub fn new(resolver: &'r ImportResolver) -> Result<Self, LoadError> {
        Ok(Analyzer {
            parser: PythonParser::new()?,
            resolver,
        })
    }

    /// Build a vertex for `path` according to its file kind. Returns `None`
    /// for anything that is not an existing Python source file.
    pub fn new_file(&mut self, path: &PathRef, mode: LoadMode) -> Option<SourceFile> {
        if !path.abs().is_file() {
            return None;
        }
        match FileKind::from_path(path.abs()) {
            FileKind::PythonSource => Some(match mode {
                LoadMode::Analyze => self.load(path.clone()),
                LoadMode::External => SourceFile::external(path.clone()),
            }),
            FileKind::PythonCompiled => None,
            FileKind::Other => {
                debug!("Unrecognized file type: {}", path);
                None
            }
        }
    }

    /// Parse `path` and resolve its imports. A file that cannot be read or
    /// parsed becomes a vertex with no imports.
    pub fn load(&mut self, path: PathRef) -> SourceFile {
        let imports = match self.scan(&path) {
            Ok(imports) => imports,
            Err(e) => {
                info!("Couldn't parse {}: {}", path, e);
                BTreeSet::new()
            }
        };
        SourceFile::analyzed(path, imports)
    }

    fn scan(&mut self, path: &PathRef) -> Result<BTreeSet<PathRef>, LoadError> {
        let source = std::fs::read_to_string(path.abs()).map_err(|source| LoadError::Io {
            path: path.abs().to_path_buf(),
            source,
        })?;
        let tree = self.parser.parse(&source)?;
        let statements = collect_imports(&tree, source.as_bytes());
        Ok(self.resolve_statements(path, &statements))
    }

    /// Union of everything the statements resolve to.
    pub fn resolve_statements(
        &self,
        importer: &PathRef,
        statements: &[ImportStatement],
    ) -> BTreeSet<PathRef> {
        let mut resolved = BTreeSet::new();
        for statement in statements {
            match statement {
                ImportStatement::Import { names } => {
                    for name in names {
                        let result = self.resolver.resolve(name);
                        self.absorb(&mut resolved, importer, name, NameOrigin::Module, result);
                    }
                }
                // Compiler directives, not modules.
                ImportStatement::From {
                    level: 0,
                    module: Some(module),
                    ..
                } if module == FUTURE_MODULE => {}
                ImportStatement::From {
                    level: 0,
                    module: Some(module),
                    names,
                } => {
                    let result = self.resolver.resolve(module);
                    self.absorb(&mut resolved, importer, module, NameOrigin::Module, result);
                    for name in names {
                        let qualified = format!("{module}.{name}");
                        let result = self.resolver.resolve(&qualified);
                        self.absorb(
                            &mut resolved,
                            importer,
                            &qualified,
                            NameOrigin::MaybeAttribute,
                            result,
                        );
                    }
                }
                ImportStatement::From { level: 0, module: None, .. } => {}
                ImportStatement::From {
                    level,
                    module,
                    names,
                } => {
                    let dots = ".".repeat(*level);
                    let display = format!("{dots}{}", module.as_deref().unwrap_or(""));
                    let base = importer.abs();
                    let result = self.resolver.resolve_relative(base, *level, module.as_deref());
                    self.absorb(&mut resolved, importer, &display, NameOrigin::Module, result);
                    for name in names {
                        let qualified = match module {
                            Some(module) => format!("{module}.{name}"),
                            None => name.clone(),
                        };
                        let result = self.resolver.resolve_relative(base, *level, Some(&qualified));
                        self.absorb(
                            &mut resolved,
                            importer,
                            &format!("{dots}{qualified}"),
                            NameOrigin::MaybeAttribute,
                            result,
                        );
                    }
                }
            }
        }
        resolved
    }

    fn absorb(
        &self,
        resolved: &mut BTreeSet<PathRef>,
        importer: &PathRef,
        name: &str,
        origin: NameOrigin,
        result: Result<BTreeSet<PathRef>, ResolveError>,
    ) {
        match (result, origin) {
            (Ok(paths), _) => resolved.extend(paths),
            (Err(e), NameOrigin::Module) => {
                info!("Failed to resolve {}:{}: {}", importer, name, e);
            }
            (Err(e), NameOrigin::MaybeAttribute) => {
                trace!("{}:{} is not a module: {}", importer, name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::test_utils::create_repo_with_structure;
    use std::path::{Path, PathBuf};

    fn analyze(root: &Path, file: &str) -> BTreeSet<PathBuf> {
        let resolver = ImportResolver::new(vec![root.to_path_buf()], root);
        let mut analyzer = Analyzer::new(&resolver).unwrap();
        let vertex = analyzer.load(PathRef::new(file, root));
        vertex.imports.iter().map(|p| p.rel()).collect()
    }

    fn rels(items: &[&str]) -> BTreeSet<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    fn package_tree(src: &str) -> tempfile::TempDir {
        create_repo_with_structure(&[
            ("src.py", src),
            ("root/__init__.py", ""),
            ("root/foo.py", ""),
            ("root/pkg/__init__.py", ""),
            ("root/pkg/mod.py", ""),
        ])
    }

    #[test]
    fn test_load_empty() {
        let temp = package_tree("");
        assert!(analyze(temp.path(), "src.py").is_empty());
    }

    #[test]
    fn test_load_malformed() {
        let temp = package_tree("invalid python\nimport root\n");
        assert!(analyze(temp.path(), "src.py").is_empty());
    }

    #[test]
    fn test_load_python2_source_has_no_imports() {
        let temp = package_tree("print \"hello\"\nimport root.foo\n");
        assert!(analyze(temp.path(), "src.py").is_empty());

        let temp = package_tree("import root.foo\nexec \"x = 1\"\n");
        assert!(analyze(temp.path(), "src.py").is_empty());
    }

    #[test]
    fn test_load_import() {
        let temp = package_tree("import root.pkg.mod\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&["root/__init__.py", "root/pkg/__init__.py", "root/pkg/mod.py"])
        );
    }

    #[test]
    fn test_load_multi_import_as() {
        let temp = package_tree("import root.foo as f, root.pkg.mod as m\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&[
                "root/__init__.py",
                "root/foo.py",
                "root/pkg/__init__.py",
                "root/pkg/mod.py",
            ])
        );
    }

    #[test]
    fn test_load_from_import_nonmod() {
        let temp = package_tree("from root.pkg import Classy\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&["root/__init__.py", "root/pkg/__init__.py"])
        );
    }

    #[test]
    fn test_load_from_import_mod() {
        let temp = package_tree("from root.pkg import mod\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&["root/__init__.py", "root/pkg/__init__.py", "root/pkg/mod.py"])
        );
    }

    #[test]
    fn test_future_import_ignored() {
        let temp = package_tree("from __future__ import annotations\nimport root.foo\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&["root/__init__.py", "root/foo.py"])
        );
    }

    #[test]
    fn test_unresolvable_import_contributes_nothing() {
        let temp = package_tree("import os\nimport root.missing\nimport root.foo\n");
        assert_eq!(
            analyze(temp.path(), "src.py"),
            rels(&["root/__init__.py", "root/foo.py"])
        );
    }

    #[test]
    fn test_load_relative_imports() {
        let temp = create_repo_with_structure(&[
            ("root/__init__.py", ""),
            ("root/util.py", ""),
            ("root/pkg/__init__.py", ""),
            ("root/pkg/mod.py", "from . import helpers, Thing\nfrom ..util import x\n"),
            ("root/pkg/helpers.py", ""),
        ]);
        assert_eq!(
            analyze(temp.path(), "root/pkg/mod.py"),
            rels(&[
                "root/__init__.py",
                "root/pkg/__init__.py",
                "root/pkg/helpers.py",
                "root/util.py",
            ])
        );
    }

    #[test]
    fn test_new_file_dispatch() {
        let temp = create_repo_with_structure(&[
            ("a.py", "import b\n"),
            ("b.py", ""),
            ("a.cpython-312.pyc", ""),
            ("notes.txt", ""),
            ("dir/", ""),
        ]);
        let root = temp.path();
        let resolver = ImportResolver::new(vec![root.to_path_buf()], root);
        let mut analyzer = Analyzer::new(&resolver).unwrap();

        let loaded = analyzer
            .new_file(&PathRef::new("a.py", root), LoadMode::Analyze)
            .unwrap();
        assert!(loaded.analyzed);
        assert_eq!(loaded.imports.len(), 1);

        let external = analyzer
            .new_file(&PathRef::new("a.py", root), LoadMode::External)
            .unwrap();
        assert!(!external.analyzed);
        assert!(external.imports.is_empty());

        for skipped in ["a.cpython-312.pyc", "notes.txt", "dir", "missing.py"] {
            assert!(
                analyzer
                    .new_file(&PathRef::new(skipped, root), LoadMode::Analyze)
                    .is_none(),
                "{skipped} should not become a vertex"
            );
        }
    }

    #[test]
    fn test_non_utf8_file_has_no_imports() {
        let temp = create_repo_with_structure(&[("bin.py", "")]);
        std::fs::write(temp.path().join("bin.py"), [0xFF, 0xFE, 0xFD]).unwrap();
        assert!(analyze(temp.path(), "bin.py").is_empty());
    }
}
