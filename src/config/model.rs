// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{LedgerMode, StageFlag};

/// Id of the synthetic node that depends on every configured stage.
pub const ENDPOINT: &str = "endpoint";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// root_working_dir = "/data/root"
/// script_dir = "/data/scripts"
///
/// [environment.lofar]
/// kind = "container"
/// image = "/images/lofar.simg"
///
/// [stage.subtract]
/// script = "sub-sources-outside-region.py"
/// environment = "lofar"
/// after = ["choose_calibrators"]
/// do = 1
///
/// [stage.subtract.args]
/// ncpu = "{ncpu}"
/// working_dir = "{workspace}"
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`] for the validated one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub pipeline: PipelineSection,

    /// Named execution environments from `[environment.<name>]`.
    #[serde(default)]
    pub environment: BTreeMap<String, EnvironmentConfig>,

    /// All stages from `[stage.<name>]`, keyed by stage id.
    #[serde(default)]
    pub stage: BTreeMap<String, StageConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, which checks
/// references, flags, placeholders and acyclicity.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub environment: BTreeMap<String, EnvironmentConfig>,
    pub stage: BTreeMap<String, StageConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        environment: BTreeMap<String, EnvironmentConfig>,
        stage: BTreeMap<String, StageConfig>,
    ) -> Self {
        Self {
            pipeline,
            environment,
            stage,
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Where the root of all working dirs is. Created if missing.
    pub root_working_dir: PathBuf,

    /// Optional sub-directory of the root for this run (e.g. one observation).
    #[serde(default)]
    pub run_name: Option<String>,

    /// Where the stage scripts live.
    pub script_dir: PathBuf,

    /// Core count forwarded to stages via `{ncpu}`; defaults to the
    /// available parallelism of this machine.
    #[serde(default)]
    pub ncpu: Option<usize>,

    /// Node the engine runs to.
    #[serde(default = "default_target")]
    pub target: String,

    /// Ledger file name, relative to the run root.
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,

    /// Timing file name, relative to the run root.
    #[serde(default = "default_timing_file")]
    pub timing_file: String,

    #[serde(default)]
    pub ledger_mode: LedgerMode,

    /// If true, a missing container image is an error instead of a fallback
    /// to the bare shell.
    #[serde(default)]
    pub strict_environments: bool,

    /// Name of the combined stdout/stderr log inside each stage's working dir.
    #[serde(default = "default_stage_log")]
    pub stage_log: String,
}

fn default_target() -> String {
    ENDPOINT.to_string()
}

fn default_ledger_file() -> String {
    "STATE".to_string()
}

fn default_timing_file() -> String {
    "timing.txt".to_string()
}

fn default_stage_log() -> String {
    crate::exec::task::DEFAULT_STAGE_LOG.to_string()
}

impl PipelineSection {
    pub fn new(root_working_dir: impl Into<PathBuf>, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_working_dir: root_working_dir.into(),
            run_name: None,
            script_dir: script_dir.into(),
            ncpu: None,
            target: default_target(),
            ledger_file: default_ledger_file(),
            timing_file: default_timing_file(),
            ledger_mode: LedgerMode::default(),
            strict_environments: false,
            stage_log: default_stage_log(),
        }
    }

    /// Directory holding the workspaces, ledger and timing file of this run.
    pub fn run_root(&self) -> PathBuf {
        match &self.run_name {
            Some(name) => self.root_working_dir.join(name),
            None => self.root_working_dir.clone(),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.run_root().join(&self.ledger_file)
    }

    pub fn timing_path(&self) -> PathBuf {
        self.run_root().join(&self.timing_file)
    }

    pub fn effective_ncpu(&self) -> usize {
        self.ncpu.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Kind of an `[environment.<name>]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Bare,
    Container,
    Activated,
}

/// `[environment.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub kind: EnvironmentKind,

    /// Container image (`kind = "container"`).
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Extra directories bound into the container.
    #[serde(default)]
    pub bind_dirs: Vec<String>,

    /// Container launcher, `singularity` if unset.
    #[serde(default)]
    pub runtime: Option<String>,

    /// Environment to activate (`kind = "activated"`).
    #[serde(default)]
    pub env: Option<String>,
}

impl EnvironmentConfig {
    pub fn bare() -> Self {
        Self {
            kind: EnvironmentKind::Bare,
            image: None,
            bind_dirs: Vec::new(),
            runtime: None,
            env: None,
        }
    }

    pub fn container(image: impl Into<PathBuf>) -> Self {
        Self {
            kind: EnvironmentKind::Container,
            image: Some(image.into()),
            ..Self::bare()
        }
    }

    pub fn activated(env: impl Into<String>) -> Self {
        Self {
            kind: EnvironmentKind::Activated,
            env: Some(env.into()),
            ..Self::bare()
        }
    }
}

/// `[stage.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Script file, relative to `pipeline.script_dir` unless absolute.
    pub script: String,

    /// Interpreter the script is run with.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Name of an `[environment.<name>]`; bare shell if unset.
    #[serde(default)]
    pub environment: Option<String>,

    /// Upstream stages, in declared order.
    #[serde(default)]
    pub after: Vec<String>,

    /// `0` = do not run, `1` = run in a clobbered workspace,
    /// `2` = run in a new versioned workspace.
    #[serde(rename = "do", default)]
    pub run_flag: u8,

    /// Forwarded as `--name=value`, in declared order. String values may
    /// contain `{ncpu}`, `{script_dir}`, `{root}`, `{workspace}` and
    /// `{workspace:<stage>}` placeholders.
    #[serde(default)]
    pub args: toml::Table,
}

fn default_shell() -> String {
    "python".to_string()
}

impl StageConfig {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            shell: default_shell(),
            environment: None,
            after: Vec::new(),
            run_flag: 0,
            args: toml::Table::new(),
        }
    }

    /// The tri-state flag; validation guarantees it is in range.
    pub fn flag(&self) -> StageFlag {
        StageFlag::try_from(self.run_flag).unwrap_or_default()
    }
}
