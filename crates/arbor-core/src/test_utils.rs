//! Test utilities for Arbor

use std::fs;
use tempfile::TempDir;

/// Create a temporary tree with the given `(path, contents)` files.
/// A path ending in `/` creates an empty directory instead.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);

        if path.ends_with('/') {
            fs::create_dir_all(&full_path).unwrap();
            continue;
        }

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// The small tree the workspace tests walk: `foo`, `dir1/file1`, `dir2/file1`.
pub fn create_simple_repo() -> TempDir {
    create_repo_with_structure(&[("foo", ""), ("dir1/file1", ""), ("dir2/file1", "")])
}

/// A Python project with a package, a nested package, and a top-level script.
///
/// ```text
/// app.py            import root.pkg.mod; from root.pkg import Classy
/// root/__init__.py
/// root/pkg/__init__.py
/// root/pkg/mod.py   from . import helpers
/// root/pkg/helpers.py
/// broken.py         (syntax error)
/// ```
pub fn create_python_repo() -> TempDir {
    create_repo_with_structure(&[
        (
            "app.py",
            "import root.pkg.mod\nfrom root.pkg import Classy\nimport os\n",
        ),
        ("root/__init__.py", ""),
        ("root/pkg/__init__.py", "class Classy:\n    pass\n"),
        ("root/pkg/mod.py", "from . import helpers\n"),
        ("root/pkg/helpers.py", "def helper():\n    return 1\n"),
        ("broken.py", "def broken(:\n    import root\n"),
    ])
}
