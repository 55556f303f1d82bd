// src/exec/env.rs

//! Execution environments a stage command can be wrapped into.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::config::model::{EnvironmentConfig, EnvironmentKind};
use crate::errors::{Result, StagedagError};
use crate::exec::shell::{quote, single_quote};
use crate::fs::FileSystem;

/// Directories every container gets bound in addition to the configured ones.
const DEFAULT_CONTAINER_BINDS: &[&str] = &["/tmp", "/dev/shm", "$HOME"];

/// Default container launcher.
pub const DEFAULT_CONTAINER_RUNTIME: &str = "singularity";

/// Wraps an inner command string so it runs inside a chosen execution context.
///
/// The inner command is always handed to `bash`, because the output
/// duplication stage relies on `PIPESTATUS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentComposer {
    /// Plain `bash -c`.
    Bare,
    /// `<runtime> exec -B <binds> <image> bash -c ...`.
    Container {
        runtime: String,
        image: PathBuf,
        bind_dirs: Vec<String>,
    },
    /// `bash -c` after sourcing the user's shell profile and activating a
    /// conda environment.
    ActivatedEnvironment { env: String },
}

impl EnvironmentComposer {
    pub fn compose(&self, inner: &str) -> String {
        match self {
            EnvironmentComposer::Bare => format!("bash -c {}", single_quote(inner)),
            EnvironmentComposer::Container {
                runtime,
                image,
                bind_dirs,
            } => {
                let binds = DEFAULT_CONTAINER_BINDS
                    .iter()
                    .map(|s| s.to_string())
                    .chain(bind_dirs.iter().map(|d| quote(d)))
                    .collect::<Vec<_>>()
                    .join(",");
                format!(
                    "{} exec -B {} {} bash -c {}",
                    quote(runtime),
                    binds,
                    quote(&image.to_string_lossy()),
                    single_quote(inner)
                )
            }
            EnvironmentComposer::ActivatedEnvironment { env } => {
                let script = format!(
                    "source $HOME/.bashrc; conda activate {}; export PYTHONPATH=; {}",
                    quote(env),
                    inner
                );
                format!("bash -c {}", single_quote(&script))
            }
        }
    }

    /// Build the composer for a configured environment.
    ///
    /// A container whose image file is missing degrades to [`Bare`](Self::Bare)
    /// with a warning, unless `strict` is set, in which case it is an error.
    pub fn from_config(
        name: &str,
        cfg: &EnvironmentConfig,
        fs: &dyn FileSystem,
        strict: bool,
    ) -> Result<Self> {
        match cfg.kind {
            EnvironmentKind::Bare => Ok(EnvironmentComposer::Bare),
            EnvironmentKind::Container => {
                let image = cfg.image.clone().ok_or_else(|| {
                    StagedagError::ConfigError(format!(
                        "environment '{name}' is a container but has no `image`"
                    ))
                })?;
                if !fs.is_file(&image) {
                    if strict {
                        return Err(StagedagError::Environment(format!(
                            "container image {} for environment '{name}' does not exist",
                            image.display()
                        )));
                    }
                    warn!(
                        environment = name,
                        image = %image.display(),
                        "container image does not exist; falling back to bare shell, required software must already be on PATH"
                    );
                    return Ok(EnvironmentComposer::Bare);
                }
                Ok(EnvironmentComposer::Container {
                    runtime: cfg
                        .runtime
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CONTAINER_RUNTIME.to_string()),
                    image,
                    bind_dirs: cfg.bind_dirs.clone(),
                })
            }
            EnvironmentKind::Activated => {
                let env = cfg.env.clone().ok_or_else(|| {
                    StagedagError::ConfigError(format!(
                        "environment '{name}' is activated but has no `env`"
                    ))
                })?;
                Ok(EnvironmentComposer::ActivatedEnvironment { env })
            }
        }
    }
}

impl fmt::Display for EnvironmentComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentComposer::Bare => write!(f, "bare"),
            EnvironmentComposer::Container { image, .. } => {
                write!(f, "container({})", image.display())
            }
            EnvironmentComposer::ActivatedEnvironment { env } => write!(f, "activated({env})"),
        }
    }
}
