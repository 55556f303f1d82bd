// src/workspace/mod.rs

//! Workspace manager: picks the concrete working directory of a stage.
//!
//! Every stage owns a family of directories under the base path:
//! the canonical `<stage>` plus versioned siblings `<stage>_1`, `<stage>_2`, ...
//! The version number orders them; the canonical directory counts as version 0.
//!
//! - [`WorkspacePolicy::Reuse`] returns the newest directory unchanged, or the
//!   canonical path when nothing exists yet. Nothing is created.
//! - [`WorkspacePolicy::Clobber`] deletes the whole family and recreates the
//!   canonical directory. This is destructive and cannot be undone.
//! - [`WorkspacePolicy::Versioned`] creates `<stage>_<newest + 1>` and keeps
//!   every prior directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::WorkspacePolicy;

/// Resolves stage working directories under one base path.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    fs: Arc<dyn FileSystem>,
    base: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::with_fs(base, Arc::new(RealFileSystem))
    }

    pub fn with_fs(base: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve (and, per policy, create or delete) the directory for `stage`.
    pub fn resolve(&self, stage: &str, policy: WorkspacePolicy) -> Result<PathBuf> {
        resolve(self.fs.as_ref(), &self.base, stage, policy)
    }

    /// The path [`resolve`](Self::resolve) would return, without touching the filesystem.
    pub fn preview(&self, stage: &str, policy: WorkspacePolicy) -> Result<PathBuf> {
        let existing = existing_versions(self.fs.as_ref(), &self.base, stage)?;
        Ok(match policy {
            WorkspacePolicy::Reuse => newest_or_canonical(&self.base, stage, &existing),
            WorkspacePolicy::Clobber => canonical_dir(&self.base, stage),
            WorkspacePolicy::Versioned => next_versioned_dir(self.fs.as_ref(), &self.base, stage, &existing),
        })
    }

    /// Every directory currently belonging to `stage`, oldest first.
    pub fn list(&self, stage: &str) -> Result<Vec<PathBuf>> {
        let existing = existing_versions(self.fs.as_ref(), &self.base, stage)?;
        Ok(existing.into_iter().map(|(_, path)| path).collect())
    }
}

/// Resolve the working directory of `stage` under `base` according to `policy`.
pub fn resolve(
    fs: &dyn FileSystem,
    base: &Path,
    stage: &str,
    policy: WorkspacePolicy,
) -> Result<PathBuf> {
    let existing = existing_versions(fs, base, stage)?;

    match policy {
        WorkspacePolicy::Reuse => {
            let dir = newest_or_canonical(base, stage, &existing);
            debug!(stage, dir = %dir.display(), "reusing working dir");
            Ok(dir)
        }
        WorkspacePolicy::Clobber => {
            for (_, dir) in &existing {
                info!(stage, dir = %dir.display(), "removing old working dir");
                fs.remove_dir_all(dir)?;
            }
            let dir = canonical_dir(base, stage);
            fs.create_dir_all(&dir)?;
            info!(stage, dir = %dir.display(), "made working dir");
            Ok(dir)
        }
        WorkspacePolicy::Versioned => {
            let dir = next_versioned_dir(fs, base, stage, &existing);
            fs.create_dir_all(&dir)?;
            info!(stage, dir = %dir.display(), "made versioned working dir");
            Ok(dir)
        }
    }
}

fn canonical_dir(base: &Path, stage: &str) -> PathBuf {
    base.join(stage)
}

fn newest_or_canonical(base: &Path, stage: &str, existing: &[(u32, PathBuf)]) -> PathBuf {
    existing
        .last()
        .map(|(_, path)| path.clone())
        .unwrap_or_else(|| canonical_dir(base, stage))
}

fn next_versioned_dir(
    fs: &dyn FileSystem,
    base: &Path,
    stage: &str,
    existing: &[(u32, PathBuf)],
) -> PathBuf {
    let Some((newest, _)) = existing.last() else {
        let canonical = canonical_dir(base, stage);
        if !fs.exists(&canonical) {
            return canonical;
        }
        return first_free_version(fs, base, stage, 1);
    };
    first_free_version(fs, base, stage, newest + 1)
}

/// Skip over plain files that happen to carry a versioned name.
fn first_free_version(fs: &dyn FileSystem, base: &Path, stage: &str, start: u32) -> PathBuf {
    let mut version = start;
    loop {
        let candidate = base.join(format!("{stage}_{version}"));
        if !fs.exists(&candidate) {
            return candidate;
        }
        version += 1;
    }
}

/// Directories of the `stage` family under `base`, sorted by version.
fn existing_versions(fs: &dyn FileSystem, base: &Path, stage: &str) -> Result<Vec<(u32, PathBuf)>> {
    if !fs.is_dir(base) {
        return Ok(Vec::new());
    }

    let mut found: Vec<(u32, PathBuf)> = fs
        .read_dir(base)?
        .into_iter()
        .filter(|path| fs.is_dir(path))
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let version = parse_version(name, stage)?;
            Some((version, path))
        })
        .collect();

    found.sort_by_key(|(version, _)| *version);
    Ok(found)
}

/// `stage` is version 0, `stage_<n>` is version n; anything else is unrelated.
fn parse_version(dir_name: &str, stage: &str) -> Option<u32> {
    if dir_name == stage {
        return Some(0);
    }
    let suffix = dir_name.strip_prefix(stage)?.strip_prefix('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
