#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use stagedag::config::{ConfigFile, EnvironmentConfig, PipelineSection, RawConfigFile, StageConfig};
use stagedag::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config: RawConfigFile {
                pipeline: PipelineSection::new(root.join("work"), root.join("scripts")),
                environment: BTreeMap::new(),
                stage: BTreeMap::new(),
            },
        }
    }

    pub fn with_stage(mut self, name: &str, stage: StageConfig) -> Self {
        self.config.stage.insert(name.to_string(), stage);
        self
    }

    pub fn with_environment(mut self, name: &str, env: EnvironmentConfig) -> Self {
        self.config.environment.insert(name.to_string(), env);
        self
    }

    pub fn with_run_name(mut self, name: &str) -> Self {
        self.config.pipeline.run_name = Some(name.to_string());
        self
    }

    pub fn with_ncpu(mut self, ncpu: usize) -> Self {
        self.config.pipeline.ncpu = Some(ncpu);
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.config.pipeline.target = target.to_string();
        self
    }

    pub fn strict_environments(mut self, strict: bool) -> Self {
        self.config.pipeline.strict_environments = strict;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(script: &str) -> Self {
        Self {
            stage: StageConfig::new(script),
        }
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.stage.shell = shell.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.stage.after.push(dep.to_string());
        self
    }

    pub fn run_flag(mut self, flag: u8) -> Self {
        self.stage.run_flag = flag;
        self
    }

    pub fn environment(mut self, env: &str) -> Self {
        self.stage.environment = Some(env.to_string());
        self
    }

    pub fn arg(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.stage.args.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
