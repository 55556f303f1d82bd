// src/exec/pbs.rs

//! PBS batch submission script for running a whole pipeline on a cluster
//! head node with `qsub`.

use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Resource request written into the `#PBS` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbsOptions {
    pub job_name: String,
    pub queue: String,
    pub nodes: u32,
    pub ppn: usize,
    pub walltime: String,
}

impl PbsOptions {
    pub fn new(job_name: impl Into<String>, ppn: usize) -> Self {
        Self {
            job_name: job_name.into(),
            queue: "main".to_string(),
            nodes: 1,
            ppn,
            walltime: "168:00:00".to_string(),
        }
    }
}

/// Render the submission script that runs `cmd`.
pub fn render_pbs_script(opts: &PbsOptions, cmd: &str) -> String {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str(&format!("#PBS -N {}\n", opts.job_name));
    script.push_str(&format!("#PBS -q {}\n", opts.queue));
    script.push_str("#PBS -v\n");
    script.push_str("#PBS -w e\n");
    script.push_str(&format!("#PBS -l nodes={}:ppn={}\n", opts.nodes, opts.ppn));
    script.push_str(&format!("#PBS -l walltime={}\n", opts.walltime));
    script.push_str(cmd);
    script.push('\n');
    script
}

/// Write the submission script to `path`.
pub fn write_pbs_script(
    fs: &dyn FileSystem,
    path: &Path,
    opts: &PbsOptions,
    cmd: &str,
) -> Result<()> {
    fs.write(path, render_pbs_script(opts, cmd).as_bytes())?;
    info!(path = %path.display(), job = %opts.job_name, "wrote PBS submit script");
    Ok(())
}
