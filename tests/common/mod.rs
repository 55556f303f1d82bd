#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub use stagedag_test_utils::init_tracing;

/// Write an executable-free stage script (run through `sh`) into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Non-empty lines of a file.
pub fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// The event part (`START a`) of every ledger line, timestamps stripped.
pub fn ledger_events(path: &Path) -> Vec<String> {
    lines(path)
        .into_iter()
        .map(|l| l.split_once(" | ").unwrap().1.to_string())
        .collect()
}
