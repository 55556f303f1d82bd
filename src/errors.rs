// src/errors.rs

//! Crate-wide error type, result alias and process exit codes.

use thiserror::Error;

/// Exit status when every stage succeeded or was skipped.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status for unexpected internal errors (IO, spawn failures outside a stage, ...).
pub const EXIT_INTERNAL_ERROR: i32 = 1;

/// Exit status for a bad invocation: unreadable or invalid config, unknown
/// target, dependency cycles. Matches clap's own usage-error status.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Exit status when a stage failed mid-run and the pipeline was aborted.
pub const PIPELINE_FAILURE_EXIT_CODE: i32 = 3;

#[derive(Error, Debug)]
pub enum StagedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Cycle detected in stage graph: {0}")]
    DependencyCycle(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Stage '{stage}' failed with exit code {code}")]
    StageFailed { stage: String, code: i32 },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagedagError {
    /// Process exit status a wrapper script should see for this error.
    ///
    /// Stage failures are kept distinct from invocation errors so automation
    /// can tell "bad invocation" from "pipeline failed mid-run".
    pub fn exit_code(&self) -> i32 {
        match self {
            StagedagError::StageFailed { .. } => PIPELINE_FAILURE_EXIT_CODE,
            StagedagError::ConfigError(_)
            | StagedagError::StageNotFound(_)
            | StagedagError::DependencyCycle(_)
            | StagedagError::Environment(_)
            | StagedagError::TomlError(_) => EXIT_CONFIG_ERROR,
            StagedagError::IoError(_) | StagedagError::Other(_) => EXIT_INTERNAL_ERROR,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StagedagError>;
