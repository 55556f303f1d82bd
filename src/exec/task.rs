// src/exec/task.rs

//! A stage bound to its program, arguments, working directory and environment.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::env::EnvironmentComposer;
use crate::exec::runnable::{InvokeFuture, Runnable};
use crate::exec::shell::quote;
use crate::types::{StageId, StageResult};

/// Default name of the per-stage combined output log inside its working dir.
pub const DEFAULT_STAGE_LOG: &str = "state.log";

/// One invokable stage.
///
/// The composed command looks like
///
/// ```text
/// bash -c 'python /scripts/solve.py --ncpu=32 2>&1 | tee -a /work/solve/state.log; exit ${PIPESTATUS[0]}'
/// ```
///
/// The trailing `exit ${PIPESTATUS[0]}` makes the whole pipeline exit with
/// the stage program's status instead of `tee`'s.
#[derive(Debug, Clone)]
pub struct Task {
    stage: StageId,
    program: Vec<String>,
    args: Vec<(String, String)>,
    working_dir: PathBuf,
    log_file: PathBuf,
    environment: EnvironmentComposer,
    enabled: bool,
}

impl Task {
    /// `program` is the argv prefix, e.g. `["python", "/scripts/solve.py"]`.
    pub fn new(
        stage: impl Into<StageId>,
        program: Vec<String>,
        working_dir: impl Into<PathBuf>,
        environment: EnvironmentComposer,
    ) -> Self {
        let working_dir = working_dir.into();
        Self {
            stage: stage.into(),
            program,
            args: Vec::new(),
            log_file: working_dir.join(DEFAULT_STAGE_LOG),
            working_dir,
            environment,
            enabled: true,
        }
    }

    /// Append a `--name=value` argument.
    pub fn add(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.args.push((name.into(), value.to_string()));
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.add(name, value);
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }

    /// Whether the stage does any work when invoked. Disabled stages report
    /// `Skipped` without spawning a process.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    /// The program and its arguments followed by the output-duplication stage.
    pub fn inner_command(&self) -> String {
        let mut words: Vec<String> = self.program.iter().map(|w| quote(w)).collect();
        words.extend(
            self.args
                .iter()
                .map(|(name, value)| quote(&format!("--{name}={value}"))),
        );
        format!(
            "{} 2>&1 | tee -a {}; exit ${{PIPESTATUS[0]}}",
            words.join(" "),
            quote(&self.log_file.to_string_lossy())
        )
    }

    /// The inner command wrapped in this task's execution environment.
    pub fn composed_command(&self) -> String {
        self.environment.compose(&self.inner_command())
    }

    /// Run the stage and map its exit status onto a [`StageResult`].
    pub async fn run(&self) -> Result<StageResult> {
        if !self.enabled {
            info!(stage = %self.stage, "stage disabled; nothing to run");
            return Ok(StageResult::Skipped);
        }

        let composed = self.composed_command();
        info!(
            stage = %self.stage,
            environment = %self.environment,
            working_dir = %self.working_dir.display(),
            "running stage command"
        );
        debug!(stage = %self.stage, cmd = %composed, "composed command");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&composed)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("spawning process for stage '{}'", self.stage))?;

        // Killed by a signal: no exit code, still a failure.
        let code = status.code().unwrap_or(-1);
        info!(stage = %self.stage, exit_code = code, "stage process exited");
        Ok(StageResult::from_exit_code(code))
    }
}

impl Runnable for Task {
    fn invoke(&mut self) -> InvokeFuture<'_> {
        Box::pin(self.run())
    }

    fn describe(&self) -> Option<String> {
        if self.enabled {
            Some(self.composed_command())
        } else {
            None
        }
    }
}
