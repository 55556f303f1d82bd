// tests/workspace_policies.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use stagedag::fs::mock::MockFileSystem;
use stagedag::types::WorkspacePolicy;
use stagedag::workspace::{resolve, WorkspaceManager};
use tempfile::tempdir;

fn mkdirs(base: &Path, names: &[&str]) {
    for name in names {
        fs::create_dir_all(base.join(name)).unwrap();
    }
}

#[test]
fn reuse_without_history_returns_canonical_path_without_creating_it() {
    let dir = tempdir().unwrap();
    let manager = WorkspaceManager::new(dir.path());

    let ws = manager.resolve("solve", WorkspacePolicy::Reuse).unwrap();

    assert_eq!(ws, dir.path().join("solve"));
    assert!(!ws.exists());
}

#[test]
fn reuse_returns_newest_version_by_number() {
    let dir = tempdir().unwrap();
    mkdirs(dir.path(), &["solve", "solve_2", "solve_10", "solve_9"]);
    let manager = WorkspaceManager::new(dir.path());

    let ws = manager.resolve("solve", WorkspacePolicy::Reuse).unwrap();
    assert_eq!(ws, dir.path().join("solve_10"));
}

#[test]
fn family_ignores_directories_of_other_stages() {
    let dir = tempdir().unwrap();
    mkdirs(dir.path(), &["solve", "solve_dds4", "solve_dds4_3", "solvex", "solve_1"]);
    let manager = WorkspaceManager::new(dir.path());

    let family = manager.list("solve").unwrap();
    assert_eq!(family, vec![dir.path().join("solve"), dir.path().join("solve_1")]);

    let ws = manager.resolve("solve_dds4", WorkspacePolicy::Reuse).unwrap();
    assert_eq!(ws, dir.path().join("solve_dds4_3"));
}

#[test]
fn clobber_removes_every_prior_directory_and_recreates_canonical() {
    let dir = tempdir().unwrap();
    mkdirs(dir.path(), &["subtract", "subtract_1", "subtract_4", "other"]);
    fs::write(dir.path().join("subtract").join("old.fits"), b"x").unwrap();
    let manager = WorkspaceManager::new(dir.path());

    let ws = manager.resolve("subtract", WorkspacePolicy::Clobber).unwrap();

    assert_eq!(ws, dir.path().join("subtract"));
    assert!(ws.is_dir());
    assert!(!ws.join("old.fits").exists());
    assert!(!dir.path().join("subtract_1").exists());
    assert!(!dir.path().join("subtract_4").exists());
    assert!(dir.path().join("other").is_dir());
}

#[test]
fn versioned_creates_canonical_first_then_numbered_siblings() {
    let dir = tempdir().unwrap();
    let manager = WorkspaceManager::new(dir.path());

    let first = manager.resolve("image", WorkspacePolicy::Versioned).unwrap();
    let second = manager.resolve("image", WorkspacePolicy::Versioned).unwrap();
    let third = manager.resolve("image", WorkspacePolicy::Versioned).unwrap();

    assert_eq!(first, dir.path().join("image"));
    assert_eq!(second, dir.path().join("image_1"));
    assert_eq!(third, dir.path().join("image_2"));
    assert!(first.is_dir() && second.is_dir() && third.is_dir());
}

#[test]
fn versioned_counts_past_the_newest_version_numerically() {
    let dir = tempdir().unwrap();
    mkdirs(dir.path(), &["image", "image_2", "image_10"]);
    let manager = WorkspaceManager::new(dir.path());

    let ws = manager.resolve("image", WorkspacePolicy::Versioned).unwrap();
    assert_eq!(ws, dir.path().join("image_11"));
}

#[test]
fn versioned_skips_plain_files_with_a_versioned_name() {
    let dir = tempdir().unwrap();
    mkdirs(dir.path(), &["image"]);
    fs::write(dir.path().join("image_1"), b"not a dir").unwrap();
    let manager = WorkspaceManager::new(dir.path());

    let ws = manager.resolve("image", WorkspacePolicy::Versioned).unwrap();
    assert_eq!(ws, dir.path().join("image_2"));
}

#[test]
fn preview_never_touches_the_filesystem() {
    let fs = MockFileSystem::new();
    fs.add_dir("/work/solve");
    fs.add_file("/work/solve/keep.txt", "data");
    let before = fs.paths();
    let manager = WorkspaceManager::with_fs("/work", Arc::new(fs.clone()));

    assert_eq!(
        manager.preview("solve", WorkspacePolicy::Clobber).unwrap(),
        Path::new("/work/solve")
    );
    assert_eq!(
        manager.preview("solve", WorkspacePolicy::Versioned).unwrap(),
        Path::new("/work/solve_1")
    );
    assert_eq!(
        manager.preview("solve", WorkspacePolicy::Reuse).unwrap(),
        Path::new("/work/solve")
    );
    assert_eq!(fs.paths(), before);
}

#[test]
fn clobber_on_mock_filesystem_drops_nested_entries() {
    let fs = MockFileSystem::new();
    fs.add_file("/work/solve/a/b.txt", "x");
    fs.add_dir("/work/solve_3");

    let ws = resolve(&fs, Path::new("/work"), "solve", WorkspacePolicy::Clobber).unwrap();

    assert_eq!(ws, Path::new("/work/solve"));
    let paths = fs.paths();
    assert!(paths.contains(&Path::new("/work/solve").to_path_buf()));
    assert!(!paths.iter().any(|p| p.starts_with("/work/solve/a")));
    assert!(!paths.contains(&Path::new("/work/solve_3").to_path_buf()));
}

#[test]
fn missing_base_directory_behaves_like_empty_history() {
    let fs = MockFileSystem::new();
    let ws = resolve(&fs, Path::new("/nowhere"), "solve", WorkspacePolicy::Reuse).unwrap();
    assert_eq!(ws, Path::new("/nowhere/solve"));
    assert!(fs.paths().is_empty());
}

#[test]
fn reuse_is_idempotent_after_a_run() {
    let dir = tempdir().unwrap();
    let manager = WorkspaceManager::new(dir.path());

    let created = manager.resolve("solve", WorkspacePolicy::Versioned).unwrap();
    let first = manager.resolve("solve", WorkspacePolicy::Reuse).unwrap();
    let second = manager.resolve("solve", WorkspacePolicy::Reuse).unwrap();

    assert_eq!(first, created);
    assert_eq!(second, first);
    assert_eq!(manager.list("solve").unwrap().len(), 1);
}
