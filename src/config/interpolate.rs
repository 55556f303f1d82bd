// src/config/interpolate.rs

//! `{placeholder}` expansion in stage argument values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, StagedagError};

const PLACEHOLDER_PATTERN: &str = r"\{([a-z_]+)(?::([^{}]+))?\}";

static PLACEHOLDER_RE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN));

/// Values available to placeholders while building one stage.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationContext<'a> {
    pub ncpu: usize,
    pub script_dir: &'a Path,
    pub root: &'a Path,
    /// The stage being built.
    pub stage: &'a str,
    /// Resolved working directory of every stage.
    pub workspaces: &'a BTreeMap<String, PathBuf>,
}

/// A placeholder found in a template: `{key}` or `{key:arg}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub key: String,
    pub arg: Option<String>,
}

fn placeholder_regex() -> Result<&'static Regex> {
    PLACEHOLDER_RE
        .as_ref()
        .map_err(|e| StagedagError::ConfigError(format!("invalid placeholder pattern: {e}")))
}

/// Every placeholder in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>> {
    let re = placeholder_regex()?;
    Ok(re
        .captures_iter(template)
        .map(|caps| Placeholder {
            key: caps[1].to_string(),
            arg: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect())
}

/// Check that every placeholder is known and every `{workspace:<stage>}`
/// names a stage accepted by `is_stage`.
pub fn check_template(
    template: &str,
    is_stage: impl Fn(&str) -> bool,
) -> std::result::Result<(), String> {
    let found = placeholders(template).map_err(|e| e.to_string())?;
    for p in found {
        match (p.key.as_str(), p.arg.as_deref()) {
            ("ncpu" | "script_dir" | "root" | "workspace", None) => {}
            ("workspace", Some(stage)) => {
                if !is_stage(stage) {
                    return Err(format!("placeholder {{workspace:{stage}}} names an unknown stage"));
                }
            }
            (key, Some(arg)) => return Err(format!("unknown placeholder {{{key}:{arg}}}")),
            (key, None) => return Err(format!("unknown placeholder {{{key}}}")),
        }
    }
    Ok(())
}

/// Expand every placeholder in `template`.
pub fn interpolate(template: &str, ctx: &InterpolationContext<'_>) -> Result<String> {
    let re = placeholder_regex()?;
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in re.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);

        let arg = caps.get(2).map(|m| m.as_str());
        let value = match (&caps[1], arg) {
            ("ncpu", None) => ctx.ncpu.to_string(),
            ("script_dir", None) => ctx.script_dir.display().to_string(),
            ("root", None) => ctx.root.display().to_string(),
            ("workspace", stage) => {
                let stage = stage.unwrap_or(ctx.stage);
                ctx.workspaces
                    .get(stage)
                    .map(|p| p.display().to_string())
                    .ok_or_else(|| {
                        StagedagError::ConfigError(format!(
                            "stage '{}' refers to the workspace of unknown stage '{}'",
                            ctx.stage, stage
                        ))
                    })?
            }
            _ => {
                return Err(StagedagError::ConfigError(format!(
                    "stage '{}' uses unknown placeholder {}",
                    ctx.stage,
                    whole.as_str()
                )));
            }
        };
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Render a TOML argument value the way the stage scripts expect it on the
/// command line. Tables, arrays and datetimes are rejected.
pub fn render_value(value: &toml::Value) -> std::result::Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        // Debug keeps the trailing `.0` of whole floats (`6.0`, not `6`).
        toml::Value::Float(f) => Ok(format!("{:?}", f)),
        toml::Value::Boolean(true) => Ok("True".to_string()),
        toml::Value::Boolean(false) => Ok("False".to_string()),
        other => Err(format!(
            "unsupported argument value {} (expected string, integer, float or boolean)",
            other
        )),
    }
}
