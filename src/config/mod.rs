// src/config/mod.rs

//! Pipeline file loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a pipeline file from disk.
//! - `validate.rs`: references, flags, placeholders and acyclicity.
//! - `interpolate.rs`: `{placeholder}` expansion in stage arguments.

pub mod interpolate;
pub mod loader;
pub mod model;
pub mod validate;

pub use interpolate::{interpolate, render_value, InterpolationContext};
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, EnvironmentConfig, EnvironmentKind, PipelineSection, RawConfigFile, StageConfig,
    ENDPOINT,
};
