// src/pipeline.rs

//! Graph construction: validated config → environments → workspaces →
//! tasks → dependency graph.
//!
//! Workspaces of every stage the target needs are resolved before anything
//! runs, so a stage's arguments can name the directory of an earlier stage.
//! Stages outside the target's closure are only previewed and never touched.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::interpolate::{interpolate, render_value, InterpolationContext};
use crate::config::model::{ConfigFile, StageConfig, ENDPOINT};
use crate::dag::{resolve_order, DependencyGraph};
use crate::engine::{Engine, PipelineReport};
use crate::errors::{Result, StagedagError};
use crate::exec::pbs::{write_pbs_script, PbsOptions};
use crate::exec::{EnvironmentComposer, NoOp, Runnable, Task};
use crate::fs::{FileSystem, RealFileSystem};
use crate::record::{RunLedger, TimingStore};
use crate::types::StageId;
use crate::workspace::WorkspaceManager;

/// Whether building a pipeline may touch the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Create the run root and clobber or version workspaces.
    Execute,
    /// Only compute what would happen.
    Preview,
}

/// A fully wired pipeline ready to run to its target.
pub struct Pipeline {
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    target: String,
    root: PathBuf,
    workspaces: BTreeMap<StageId, PathBuf>,
    graph: DependencyGraph<Box<dyn Runnable>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("target", &self.target)
            .field("root", &self.root)
            .field("workspaces", &self.workspaces)
            .field("stages", &self.graph.len())
            .finish()
    }
}

impl Pipeline {
    /// Build against the real filesystem, running to `[pipeline].target`.
    pub fn build(config: ConfigFile, mode: BuildMode) -> Result<Self> {
        let target = config.pipeline.target.clone();
        Self::build_with(config, Arc::new(RealFileSystem), &target, mode)
    }

    pub fn build_with(
        config: ConfigFile,
        fs: Arc<dyn FileSystem>,
        target: &str,
        mode: BuildMode,
    ) -> Result<Self> {
        let root = config.pipeline.run_root();
        if mode == BuildMode::Execute {
            fs.create_dir_all(&root)?;
        }

        let all_stages: Vec<StageId> = config.stage.keys().cloned().collect();
        if target != ENDPOINT && !config.stage.contains_key(target) {
            return Err(StagedagError::StageNotFound(target.to_string()));
        }
        let needed: HashSet<StageId> = resolve_order(target, |id| {
            if id == ENDPOINT {
                all_stages.as_slice()
            } else {
                config
                    .stage
                    .get(id)
                    .map(|s| s.after.as_slice())
                    .unwrap_or(&[])
            }
        })
        .into_iter()
        .collect();

        let environments = build_environments(&config, fs.as_ref())?;
        let workspaces = resolve_workspaces(&config, fs.clone(), &root, &needed, mode)?;

        let mut builder = DependencyGraph::<Box<dyn Runnable>>::builder();
        for (name, stage) in config.stage.iter() {
            let environment = match &stage.environment {
                Some(env) => environments.get(env).cloned().ok_or_else(|| {
                    StagedagError::ConfigError(format!(
                        "stage '{name}' uses unknown environment '{env}'"
                    ))
                })?,
                None => EnvironmentComposer::Bare,
            };
            let task = build_task(&config, name, stage, &root, &workspaces, environment)?;
            builder.add_node(name.as_str(), stage.after.iter().cloned(), Box::new(task));
        }
        builder.add_node(ENDPOINT, all_stages.iter().cloned(), Box::new(NoOp));
        let graph = builder.build()?;

        Ok(Self {
            config,
            fs,
            target: target.to_string(),
            root,
            workspaces,
            graph,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Directory holding the workspaces, ledger and timing file of this run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace_of(&self, stage: &str) -> Option<&Path> {
        self.workspaces.get(stage).map(|p| p.as_path())
    }

    pub fn graph(&self) -> &DependencyGraph<Box<dyn Runnable>> {
        &self.graph
    }

    pub fn order(&self) -> Result<Vec<StageId>> {
        self.graph.resolve(&self.target)
    }

    /// Run to the target, writing the ledger and timing file in the run root.
    pub async fn run(&mut self) -> Result<PipelineReport> {
        let pipeline = &self.config.pipeline;
        let ledger = RunLedger::open(pipeline.ledger_path(), pipeline.ledger_mode)?;
        let timing = TimingStore::with_fs(pipeline.timing_path(), self.fs.clone());

        let mut engine = Engine::new(ledger).with_timing(timing);
        engine.run(&mut self.graph, &self.target).await
    }

    /// Resolved order, workspaces and composed commands, one block per stage.
    pub fn render_plan(&self) -> Result<String> {
        let order = self.order()?;
        let mut out = String::new();
        let _ = writeln!(out, "run root: {}", self.root.display());
        let _ = writeln!(out, "target: {}", self.target);
        let _ = writeln!(out, "order: {}", order.join(" -> "));

        for (idx, id) in order.iter().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "[{}] {}", idx + 1, id);
            if let Some(dir) = self.workspaces.get(id) {
                let _ = writeln!(out, "    workspace: {}", dir.display());
            }
            let description = self
                .graph
                .node(id)
                .and_then(|node| node.runnable.describe());
            match description {
                Some(cmd) => {
                    let _ = writeln!(out, "    command: {}", cmd);
                }
                None => {
                    let _ = writeln!(out, "    (no work, recorded as skipped)");
                }
            }
        }
        Ok(out)
    }

    /// Write a PBS submission script that re-runs this pipeline with `cmd`.
    pub fn write_pbs_script(&self, path: &Path, cmd: &str) -> Result<()> {
        let job_name = self
            .config
            .pipeline
            .run_name
            .clone()
            .unwrap_or_else(|| "stagedag".to_string());
        let opts = PbsOptions::new(job_name, self.config.pipeline.effective_ncpu());
        write_pbs_script(self.fs.as_ref(), path, &opts, cmd)
    }
}

fn build_environments(
    config: &ConfigFile,
    fs: &dyn FileSystem,
) -> Result<BTreeMap<String, EnvironmentComposer>> {
    let strict = config.pipeline.strict_environments;
    let mut environments = BTreeMap::new();
    for (name, env) in config.environment.iter() {
        let composer = EnvironmentComposer::from_config(name, env, fs, strict)?;
        debug!(environment = %name, composer = %composer, "environment ready");
        environments.insert(name.clone(), composer);
    }
    Ok(environments)
}

fn resolve_workspaces(
    config: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    root: &Path,
    needed: &HashSet<StageId>,
    mode: BuildMode,
) -> Result<BTreeMap<StageId, PathBuf>> {
    let manager = WorkspaceManager::with_fs(root, fs);
    let mut workspaces = BTreeMap::new();

    for (name, stage) in config.stage.iter() {
        let policy = stage.flag().policy();
        let dir = if mode == BuildMode::Execute && needed.contains(name) {
            manager.resolve(name, policy)?
        } else {
            manager.preview(name, policy)?
        };
        workspaces.insert(name.clone(), dir);
    }
    Ok(workspaces)
}

fn build_task(
    config: &ConfigFile,
    name: &str,
    stage: &StageConfig,
    root: &Path,
    workspaces: &BTreeMap<StageId, PathBuf>,
    environment: EnvironmentComposer,
) -> Result<Task> {
    let pipeline = &config.pipeline;
    let working_dir = workspaces
        .get(name)
        .cloned()
        .ok_or_else(|| StagedagError::StageNotFound(name.to_string()))?;

    let script = pipeline.script_dir.join(&stage.script);
    let program = vec![stage.shell.clone(), script.to_string_lossy().into_owned()];

    let ctx = InterpolationContext {
        ncpu: pipeline.effective_ncpu(),
        script_dir: &pipeline.script_dir,
        root,
        stage: name,
        workspaces,
    };

    let flag = stage.flag();
    let mut task = Task::new(name, program, &working_dir, environment)
        .with_log_file(working_dir.join(&pipeline.stage_log))
        .with_enabled(flag.is_enabled());

    for (key, value) in stage.args.iter() {
        let rendered = render_value(value).map_err(|e| {
            StagedagError::ConfigError(format!("stage '{name}', argument '{key}': {e}"))
        })?;
        task.add(key.as_str(), interpolate(&rendered, &ctx)?);
    }

    debug!(stage = name, ?flag, working_dir = %working_dir.display(), "task built");
    Ok(task)
}

/// Log the configuration a run is about to use.
pub fn log_config(config: &ConfigFile) {
    let p = &config.pipeline;
    info!(
        root = %p.run_root().display(),
        script_dir = %p.script_dir.display(),
        ncpu = p.effective_ncpu(),
        pipeline_target = %p.target,
        ledger = %p.ledger_path().display(),
        timing = %p.timing_path().display(),
        "running with"
    );
    for (name, stage) in config.stage.iter() {
        info!(
            stage = %name,
            flag = stage.run_flag,
            script = %stage.script,
            environment = stage.environment.as_deref().unwrap_or("bare"),
            after = ?stage.after,
            "stage configured"
        );
    }
}
