// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StagedagError};

/// Load a pipeline file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        StagedagError::ConfigError(format!(
            "cannot read pipeline file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_from_str(&contents)
}

/// Parse a pipeline file from an in-memory TOML string.
pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a pipeline file from path and validate it.
///
/// Checks for:
///   - unknown `after` and `environment` references,
///   - dependency cycles,
///   - out-of-range `do` flags,
///   - unknown argument placeholders and unsupported argument values.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}
