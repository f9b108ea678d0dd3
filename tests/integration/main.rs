//! Integration tests for Arbor
//!
//! These tests drive the workspace, indexer and watcher together, and run
//! the `arbor` binary against temporary projects.

use arbor_core::test_utils::{create_python_repo, create_repo_with_structure};
use arbor_core::{PathRef, Workspace};
use std::path::Path;
use std::process::{Command, Output};

fn arbor(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute arbor")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_cli_invocation() {
    let temp_dir = create_repo_with_structure(&[]);
    let output = arbor(temp_dir.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("arbor"));
    assert!(stdout.contains("Python import graph"));
}

#[test]
fn test_cli_init() {
    let temp_dir = create_repo_with_structure(&[]);
    assert!(arbor(temp_dir.path(), &["init"]).status.success());
    assert!(temp_dir.path().join(".arbor").is_dir());

    // A second init refuses to touch the existing directory.
    assert!(!arbor(temp_dir.path(), &["init"]).status.success());
}

#[test]
fn test_cli_files() {
    let temp_dir = create_python_repo();

    let all = stdout_lines(&arbor(temp_dir.path(), &["files"]));
    assert_eq!(
        all,
        vec![
            "app.py",
            "broken.py",
            "root/__init__.py",
            "root/pkg/__init__.py",
            "root/pkg/helpers.py",
            "root/pkg/mod.py",
        ]
    );

    let matched = stdout_lines(&arbor(temp_dir.path(), &["files", "pkg/m"]));
    assert_eq!(matched, vec!["root/pkg/mod.py"]);
}

#[test]
fn test_cli_index() {
    let temp_dir = create_python_repo();
    let output = arbor(temp_dir.path(), &["index"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["6 files (0 external), 5 import edges"]
    );
}

#[test]
fn test_cli_deps_and_rdeps() {
    let temp_dir = create_python_repo();
    let dir = temp_dir.path();

    let deps = stdout_lines(&arbor(dir, &["deps", "root/pkg/mod.py"]));
    assert_eq!(deps, vec!["root/pkg/__init__.py", "root/pkg/helpers.py"]);

    let rdeps = stdout_lines(&arbor(dir, &["rdeps", "root/pkg/helpers.py"]));
    assert_eq!(rdeps, vec!["root/pkg/mod.py"]);

    let transitive = stdout_lines(&arbor(dir, &["rdeps", "--transitive", "root/pkg/helpers.py"]));
    assert_eq!(transitive, vec!["app.py", "root/pkg/mod.py"]);

    assert!(!arbor(dir, &["deps", "missing.py"]).status.success());
}

#[test]
fn test_cli_remote_workspace() {
    let project = create_python_repo();
    let config = format!(
        "{{\"root_dir\": {:?}, \"exclude_files\": [\"root\"]}}",
        project.path().display().to_string()
    );
    let elsewhere = create_repo_with_structure(&[("ws/config", config.as_str())]);

    let output = arbor(elsewhere.path(), &["--workspace", "ws", "files"]);
    assert!(output.status.success());
    let listed = stdout_lines(&output);
    assert_eq!(listed.len(), 2);
    assert!(listed[0].ends_with("app.py"));
    assert!(listed[1].ends_with("broken.py"));
}

#[tokio::test]
async fn test_watcher_tracks_new_files() {
    use arbor_watcher::WatcherService;

    let temp_dir = create_python_repo();
    let workspace = Workspace::open(temp_dir.path().join(".arbor"), false).unwrap();
    let root = workspace.root_dir();
    let service = WatcherService::new(workspace).unwrap();

    std::fs::write(root.join("cli.py"), "from root.pkg import mod\n").unwrap();
    let change = service
        .apply_changes(&[root.join("cli.py")])
        .await
        .unwrap();
    assert!(change.added.contains(&PathRef::new("cli.py", &root)));

    std::fs::remove_file(root.join("app.py")).unwrap();
    let change = service
        .apply_changes(&[root.join("app.py")])
        .await
        .unwrap();
    assert!(change.removed.contains(&PathRef::new("app.py", &root)));

    let graph = service.graph();
    let graph = graph.read().await;
    let importers: Vec<String> = graph
        .dependents(root.join("root/pkg/mod.py"))
        .iter()
        .map(|f| f.path.basename())
        .collect();
    assert_eq!(importers, vec!["cli.py"]);
}
