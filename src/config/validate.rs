// src/config/validate.rs

use crate::config::interpolate::{check_template, render_value};
use crate::config::model::{ConfigFile, EnvironmentKind, RawConfigFile, ENDPOINT};
use crate::dag::graph::ensure_acyclic;
use crate::errors::{Result, StagedagError};
use crate::types::{StageFlag, StageId};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StagedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.pipeline,
            raw.environment,
            raw.stage,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_pipeline_section(cfg)?;
    validate_environments(cfg)?;
    validate_stage_names(cfg)?;
    validate_stages(cfg)?;
    validate_stage_dependencies(cfg)?;
    validate_dag(cfg)?;
    validate_target(cfg)?;
    validate_args(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> StagedagError {
    StagedagError::ConfigError(msg.into())
}

fn ensure_has_stages(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(config_err(
            "pipeline file must contain at least one [stage.<name>] section",
        ));
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &RawConfigFile) -> Result<()> {
    let p = &cfg.pipeline;

    if p.ncpu == Some(0) {
        return Err(config_err("[pipeline].ncpu must be >= 1 (got 0)"));
    }
    for (key, value) in [
        ("ledger_file", &p.ledger_file),
        ("timing_file", &p.timing_file),
        ("stage_log", &p.stage_log),
    ] {
        if value.trim().is_empty() {
            return Err(config_err(format!("[pipeline].{key} must not be empty")));
        }
    }
    if let Some(name) = &p.run_name {
        if name.trim().is_empty() || name.contains('/') {
            return Err(config_err(format!(
                "[pipeline].run_name must be a single directory name (got '{name}')"
            )));
        }
    }
    Ok(())
}

fn validate_environments(cfg: &RawConfigFile) -> Result<()> {
    for (name, env) in cfg.environment.iter() {
        match env.kind {
            EnvironmentKind::Bare => {}
            EnvironmentKind::Container => {
                if env.image.is_none() {
                    return Err(config_err(format!(
                        "environment '{name}' is a container but has no `image`"
                    )));
                }
            }
            EnvironmentKind::Activated => {
                if env.env.as_deref().is_none_or(|e| e.trim().is_empty()) {
                    return Err(config_err(format!(
                        "environment '{name}' is activated but has no `env`"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Stage names become directory names, timing keys and ledger ids, so they
/// must be one path component without separators or comment markers.
fn validate_stage_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.stage.keys() {
        let safe = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !safe {
            return Err(config_err(format!(
                "stage name '{name}' must only use letters, digits, '_', '.' and '-'"
            )));
        }
    }

    // `x_<digits>` is the directory of version <digits> of stage `x`.
    for name in cfg.stage.keys() {
        for other in cfg.stage.keys() {
            let Some(suffix) = other
                .strip_prefix(name.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
            else {
                continue;
            };
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                return Err(config_err(format!(
                    "stage name '{other}' clashes with version {suffix} of stage '{name}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_stages(cfg: &RawConfigFile) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        if name == ENDPOINT {
            return Err(config_err(format!(
                "stage name '{ENDPOINT}' is reserved for the pipeline end node"
            )));
        }
        if stage.script.trim().is_empty() {
            return Err(config_err(format!("stage '{name}' has an empty `script`")));
        }
        if stage.shell.trim().is_empty() {
            return Err(config_err(format!("stage '{name}' has an empty `shell`")));
        }
        StageFlag::try_from(stage.run_flag)
            .map_err(|e| config_err(format!("stage '{name}': {e}")))?;

        if let Some(env) = &stage.environment {
            if !cfg.environment.contains_key(env) {
                return Err(config_err(format!(
                    "stage '{name}' uses unknown environment '{env}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_stage_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            if dep == name {
                return Err(config_err(format!(
                    "stage '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.stage.contains_key(dep) {
                return Err(config_err(format!(
                    "stage '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let ids: Vec<StageId> = cfg.stage.keys().cloned().collect();
    ensure_acyclic(&ids, |id| {
        cfg.stage
            .get(id)
            .map(|s| s.after.as_slice())
            .unwrap_or(&[])
    })
}

fn validate_target(cfg: &RawConfigFile) -> Result<()> {
    let target = cfg.pipeline.target.as_str();
    if target != ENDPOINT && !cfg.stage.contains_key(target) {
        return Err(StagedagError::StageNotFound(format!(
            "[pipeline].target '{target}' is neither '{ENDPOINT}' nor a configured stage"
        )));
    }
    Ok(())
}

fn validate_args(cfg: &RawConfigFile) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        for (key, value) in stage.args.iter() {
            if key.is_empty() || key.starts_with('-') {
                return Err(config_err(format!(
                    "stage '{name}' has invalid argument name '{key}'"
                )));
            }
            let rendered = render_value(value)
                .map_err(|e| config_err(format!("stage '{name}', argument '{key}': {e}")))?;
            check_template(&rendered, |s| cfg.stage.contains_key(s))
                .map_err(|e| config_err(format!("stage '{name}', argument '{key}': {e}")))?;
        }
    }
    Ok(())
}
