// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical stage identifier used throughout the crate.
pub type StageId = String;

/// Outcome of invoking one stage.
///
/// `Skipped` means "no work was required" and is never conflated with
/// `Success`. `Failed` always carries a non-zero code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageResult {
    Success,
    Skipped,
    Failed(i32),
}

impl StageResult {
    /// Map a process exit code onto a result: `0` succeeds, anything else fails.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            StageResult::Success
        } else {
            StageResult::Failed(code)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StageResult::Failed(_))
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageResult::Success => write!(f, "success"),
            StageResult::Skipped => write!(f, "skipped"),
            StageResult::Failed(code) => write!(f, "failed({code})"),
        }
    }
}

/// How a stage's working directory is chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePolicy {
    /// Return the most recent directory for the stage unchanged.
    Reuse,
    /// Delete every prior directory for the stage and recreate the canonical one.
    Clobber,
    /// Create a fresh, suffixed directory and keep the old ones.
    Versioned,
}

/// Tri-state per-stage enable flag (`do = 0 | 1 | 2` in the config file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageFlag {
    /// Do not run; reuse whatever workspace already exists.
    #[default]
    Skip,
    /// Run in a freshly clobbered workspace.
    RunClobber,
    /// Run in a new versioned workspace.
    RunVersioned,
}

impl StageFlag {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, StageFlag::Skip)
    }

    pub fn policy(&self) -> WorkspacePolicy {
        match self {
            StageFlag::Skip => WorkspacePolicy::Reuse,
            StageFlag::RunClobber => WorkspacePolicy::Clobber,
            StageFlag::RunVersioned => WorkspacePolicy::Versioned,
        }
    }
}

impl TryFrom<u8> for StageFlag {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StageFlag::Skip),
            1 => Ok(StageFlag::RunClobber),
            2 => Ok(StageFlag::RunVersioned),
            other => Err(format!(
                "invalid stage flag {other} (expected 0 = skip, 1 = clobber, 2 = versioned)"
            )),
        }
    }
}

/// What happens to an existing ledger file when a new run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Start each run with an empty ledger (one run per file).
    #[default]
    Truncate,
    /// Keep previous runs and append the new one after them.
    Append,
}

impl FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "truncate" => Ok(LedgerMode::Truncate),
            "append" => Ok(LedgerMode::Append),
            other => Err(format!(
                "invalid ledger_mode: {other} (expected \"truncate\" or \"append\")"
            )),
        }
    }
}
