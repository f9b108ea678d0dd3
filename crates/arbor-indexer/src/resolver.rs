//! Module resolution: dotted names to the files importing them would load

use crate::error::ResolveError;
use arbor_core::{PathRef, Workspace};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File that makes a directory a package.
pub const PACKAGE_INIT: &str = "__init__.py";

/// Where a single module name was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLocation {
    /// A plain `.py` module file.
    Source(PathBuf),
    /// A package directory containing [`PACKAGE_INIT`].
    Package(PathBuf),
}

/// Locates one undotted module name in a list of directories.
pub trait ModuleFinder: Send + Sync {
    /// Search `search_path` in order and return the first match.
    fn find_module(&self, name: &str, search_path: &[PathBuf]) -> Option<ModuleLocation>;

    /// Whether `dir` is a package directory.
    fn is_package(&self, dir: &Path) -> bool {
        dir.join(PACKAGE_INIT).is_file()
    }
}

/// Finds modules on disk. In each directory a package shadows a module of
/// the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModuleFinder;

impl ModuleFinder for FsModuleFinder {
    fn find_module(&self, name: &str, search_path: &[PathBuf]) -> Option<ModuleLocation> {
        for dir in search_path {
            let package = dir.join(name);
            if self.is_package(&package) {
                return Some(ModuleLocation::Package(package));
            }
            let module = dir.join(format!("{name}.py"));
            if module.is_file() {
                return Some(ModuleLocation::Source(module));
            }
        }
        None
    }
}

/// Resolves dotted module names against an ordered search path.
pub struct ImportResolver {
    finder: Box<dyn ModuleFinder>,
    search_path: Vec<PathBuf>,
    root: PathBuf,
}

impl std::fmt::Debug for ImportResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportResolver")
            .field("search_path", &self.search_path)
            .field("root", &self.root)
            .finish()
    }
}

impl ImportResolver {
    /// A resolver that looks on disk. `root` is the workspace root the
    /// resolved [`PathRef`]s remember.
    pub fn new(search_path: Vec<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::with_finder(FsModuleFinder, search_path, root)
    }

    pub fn with_finder(
        finder: impl ModuleFinder + 'static,
        search_path: Vec<PathBuf>,
        root: impl Into<PathBuf>,
    ) -> Self {
        ImportResolver {
            finder: Box::new(finder),
            search_path,
            root: root.into(),
        }
    }

    /// A disk resolver using the workspace's module search path.
    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(workspace.module_search_path(), workspace.root_dir())
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resolve an absolute dotted name such as `a.b.c`.
    ///
    /// The result holds the initializer of every package traversed plus the
    /// final module file (or the final package's initializer).
    pub fn resolve(&self, module: &str) -> Result<BTreeSet<PathRef>, ResolveError> {
        self.resolve_in(module, self.search_path.clone())
    }

    /// Resolve a relative import found in `importer`.
    ///
    /// `level` is the number of leading dots: 1 is the importer's own
    /// directory, each extra dot climbs one directory. The base package's
    /// initializer is included when the base is a package.
    pub fn resolve_relative(
        &self,
        importer: &Path,
        level: usize,
        module: Option<&str>,
    ) -> Result<BTreeSet<PathRef>, ResolveError> {
        let mut base = importer
            .parent()
            .ok_or_else(|| ResolveError::BeyondTopLevel(importer.to_path_buf()))?;
        for _ in 1..level {
            base = base
                .parent()
                .ok_or_else(|| ResolveError::BeyondTopLevel(importer.to_path_buf()))?;
        }

        let mut resolved = BTreeSet::new();
        if self.finder.is_package(base) {
            resolved.insert(PathRef::new(base.join(PACKAGE_INIT), &self.root));
        }
        if let Some(module) = module {
            resolved.extend(self.resolve_in(module, vec![base.to_path_buf()])?);
        }
        Ok(resolved)
    }

    fn resolve_in(
        &self,
        module: &str,
        search_path: Vec<PathBuf>,
    ) -> Result<BTreeSet<PathRef>, ResolveError> {
        let segments: Vec<&str> = module.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResolveError::InvalidName(module.to_string()));
        }

        let mut resolved = BTreeSet::new();
        let mut search_path = search_path;
        for (i, segment) in segments.iter().enumerate() {
            let is_last = i + 1 == segments.len();
            match self.finder.find_module(segment, &search_path) {
                None => {
                    return Err(ResolveError::NotFound {
                        module: module.to_string(),
                        segment: segment.to_string(),
                    });
                }
                Some(ModuleLocation::Package(dir)) => {
                    resolved.insert(PathRef::new(dir.join(PACKAGE_INIT), &self.root));
                    search_path = vec![dir];
                }
                Some(ModuleLocation::Source(file)) => {
                    if !is_last {
                        return Err(ResolveError::NotAPackage {
                            module: module.to_string(),
                            file,
                        });
                    }
                    resolved.insert(PathRef::new(file, &self.root));
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory finder keyed by `(name, directory)`.
    struct MapFinder {
        modules: HashMap<(String, PathBuf), ModuleLocation>,
    }

    impl MapFinder {
        fn new(entries: &[(&str, &str, ModuleLocation)]) -> Self {
            let modules = entries
                .iter()
                .map(|(name, dir, loc)| ((name.to_string(), PathBuf::from(dir)), loc.clone()))
                .collect();
            MapFinder { modules }
        }
    }

    impl ModuleFinder for MapFinder {
        fn find_module(&self, name: &str, search_path: &[PathBuf]) -> Option<ModuleLocation> {
            search_path
                .iter()
                .find_map(|dir| self.modules.get(&(name.to_string(), dir.clone())).cloned())
        }

        fn is_package(&self, dir: &Path) -> bool {
            self.modules
                .values()
                .any(|loc| *loc == ModuleLocation::Package(dir.to_path_buf()))
        }
    }

    fn virtual_tree() -> ImportResolver {
        let finder = MapFinder::new(&[
            ("root", "/virtual", ModuleLocation::Package("/virtual/root".into())),
            ("pkg", "/virtual/root", ModuleLocation::Package("/virtual/root/pkg".into())),
            ("foo", "/virtual/root", ModuleLocation::Source("/virtual/root/foo.py".into())),
            (
                "mod",
                "/virtual/root/pkg",
                ModuleLocation::Source("/virtual/root/pkg/mod.py".into()),
            ),
        ]);
        ImportResolver::with_finder(finder, vec!["/virtual".into()], "/virtual")
    }

    fn abs_set(refs: &BTreeSet<PathRef>) -> BTreeSet<PathBuf> {
        refs.iter().map(|p| p.abs().to_path_buf()).collect()
    }

    fn paths(items: &[&str]) -> BTreeSet<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_resolve_nested_module() {
        let resolved = virtual_tree().resolve("root.pkg.mod").unwrap();
        assert_eq!(
            abs_set(&resolved),
            paths(&[
                "/virtual/root/__init__.py",
                "/virtual/root/pkg/__init__.py",
                "/virtual/root/pkg/mod.py",
            ])
        );
    }

    #[test]
    fn test_resolve_package() {
        let resolved = virtual_tree().resolve("root.pkg").unwrap();
        assert_eq!(
            abs_set(&resolved),
            paths(&["/virtual/root/__init__.py", "/virtual/root/pkg/__init__.py"])
        );
    }

    #[test]
    fn test_resolve_missing_attribute() {
        let err = virtual_tree().resolve("root.pkg.Classy").unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                module: "root.pkg.Classy".to_string(),
                segment: "Classy".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_through_module_fails() {
        let err = virtual_tree().resolve("root.foo.bar").unwrap_err();
        assert!(matches!(err, ResolveError::NotAPackage { .. }));
    }

    #[test]
    fn test_resolve_invalid_names() {
        let resolver = virtual_tree();
        assert!(matches!(resolver.resolve(""), Err(ResolveError::InvalidName(_))));
        assert!(matches!(resolver.resolve("root..pkg"), Err(ResolveError::InvalidName(_))));
    }

    #[test]
    fn test_search_path_order() {
        let finder = MapFinder::new(&[
            ("util", "/first", ModuleLocation::Source("/first/util.py".into())),
            ("util", "/second", ModuleLocation::Source("/second/util.py".into())),
        ]);
        let resolver =
            ImportResolver::with_finder(finder, vec!["/first".into(), "/second".into()], "/");
        assert_eq!(abs_set(&resolver.resolve("util").unwrap()), paths(&["/first/util.py"]));
    }

    #[test]
    fn test_resolve_relative() {
        let resolver = virtual_tree();
        let importer = Path::new("/virtual/root/pkg/mod.py");

        let sibling = resolver.resolve_relative(importer, 1, Some("mod")).unwrap();
        assert_eq!(
            abs_set(&sibling),
            paths(&["/virtual/root/pkg/__init__.py", "/virtual/root/pkg/mod.py"])
        );

        let parent = resolver.resolve_relative(importer, 2, Some("foo")).unwrap();
        assert_eq!(
            abs_set(&parent),
            paths(&["/virtual/root/__init__.py", "/virtual/root/foo.py"])
        );

        let bare = resolver.resolve_relative(importer, 1, None).unwrap();
        assert_eq!(abs_set(&bare), paths(&["/virtual/root/pkg/__init__.py"]));
    }

    #[test]
    fn test_resolve_relative_too_deep() {
        let resolver = virtual_tree();
        let err = resolver
            .resolve_relative(Path::new("/top.py"), 3, Some("x"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::BeyondTopLevel(_)));
    }

    #[test]
    fn test_fs_finder_prefers_package() {
        let temp = arbor_core::test_utils::create_repo_with_structure(&[
            ("dup/__init__.py", ""),
            ("dup.py", ""),
            ("plain/readme.txt", ""),
            ("plain.py", ""),
        ]);
        let search = vec![temp.path().to_path_buf()];
        assert_eq!(
            FsModuleFinder.find_module("dup", &search),
            Some(ModuleLocation::Package(temp.path().join("dup")))
        );
        // A directory without an initializer is not a package.
        assert_eq!(
            FsModuleFinder.find_module("plain", &search),
            Some(ModuleLocation::Source(temp.path().join("plain.py")))
        );
        assert_eq!(FsModuleFinder.find_module("absent", &search), None);
    }
}
