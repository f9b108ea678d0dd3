//! Workspace-aware filesystem paths

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Smallest `max_len` accepted by [`PathRef::abbreviate`].
pub const MIN_ABBREVIATION: usize = 16;

const ELLIPSIS: &str = "..";

/// A location in the filesystem that also remembers the workspace root it
/// was created against.
///
/// The absolute form is always canonical (symlinks resolved, no `.`/`..`
/// segments), so two refs spelled differently compare equal as long as they
/// name the same place under the same root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRef {
    abs: PathBuf,
    root: PathBuf,
}

impl PathRef {
    /// Create a ref for `path`. Relative paths are joined onto `root` first.
    /// Never fails: missing filesystem entries are normalized lexically.
    pub fn new(path: impl AsRef<Path>, root: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root = canonicalize(root.as_ref());
        let abs = if path.is_absolute() {
            canonicalize(path)
        } else {
            canonicalize(&root.join(path))
        };
        PathRef { abs, root }
    }

    /// Canonical absolute path.
    pub fn abs(&self) -> &Path {
        &self.abs
    }

    /// Canonical workspace root this ref was created against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the workspace root. May climb out of the root with
    /// `..` segments when the path lies elsewhere.
    pub fn rel(&self) -> PathBuf {
        relative_to(&self.abs, &self.root)
    }

    /// Whichever of the relative or absolute spelling is shorter.
    pub fn shortest(&self) -> String {
        let rel = self.rel().to_string_lossy().into_owned();
        let abs = self.abs.to_string_lossy().into_owned();
        if rel.chars().count() < abs.chars().count() {
            rel
        } else {
            abs
        }
    }

    pub fn in_workspace(&self) -> bool {
        self.abs.starts_with(&self.root)
    }

    pub fn basename(&self) -> String {
        self.abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_dir(&self) -> bool {
        self.abs.is_dir()
    }

    /// Shortest textual form, with characters cut out of the middle if
    /// needed to fit `max_len`.
    ///
    /// Two thirds of the budget go to the suffix, the rest (less the `..`
    /// marker) to the prefix. With `require_basename` the suffix always
    /// covers the whole basename, so a long basename can push the result
    /// past `max_len`. Values of `max_len` below [`MIN_ABBREVIATION`] are
    /// raised to it.
    pub fn abbreviate(&self, max_len: usize, require_basename: bool) -> String {
        let max_len = max_len.max(MIN_ABBREVIATION);
        let shortest = self.shortest();
        let chars: Vec<char> = shortest.chars().collect();
        if chars.len() <= max_len {
            return shortest;
        }

        let mut suffix_len = max_len * 2 / 3;
        if require_basename {
            let basename_len = Path::new(&shortest)
                .file_name()
                .map_or(0, |n| n.to_string_lossy().chars().count());
            suffix_len = suffix_len.max(basename_len);
        }
        let suffix_len = suffix_len.min(chars.len());
        let prefix_len = max_len.saturating_sub(suffix_len + ELLIPSIS.len());

        let prefix: String = chars[..prefix_len].iter().collect();
        let suffix: String = chars[chars.len() - suffix_len..].iter().collect();
        format!("{prefix}{ELLIPSIS}{suffix}")
    }
}

impl Ord for PathRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.abs
            .cmp(&other.abs)
            .then_with(|| self.root.cmp(&other.root))
    }
}

impl PartialOrd for PathRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<Path> for PathRef {
    fn as_ref(&self) -> &Path {
        &self.abs
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shortest())
    }
}

/// Resolve `path` to an absolute, symlink-free, lexically normal form.
///
/// Unlike [`std::fs::canonicalize`] this tolerates paths that do not exist:
/// the longest existing prefix is resolved on disk and the remainder is
/// normalized lexically.
pub fn canonicalize(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path) {
        return real;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    let mut on_disk = true;
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => {
                out.push(name);
                if on_disk {
                    match fs::canonicalize(&out) {
                        Ok(real) => out = real,
                        Err(_) => on_disk = false,
                    }
                }
            }
        }
    }
    out
}

/// Lexical path from `base` to `path`; both must be canonical.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
