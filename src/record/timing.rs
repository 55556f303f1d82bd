// src/record/timing.rs

//! Longitudinal per-stage timing history.
//!
//! One line per stage, samples growing rightward across runs:
//!
//! ```text
//! subtract,11532.07,11870.44
//! solve_dds4,30211.90
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::StageId;

/// Stage id → duration samples (seconds, already formatted), in file order.
pub type TimingRecord = Vec<(StageId, Vec<String>)>;

/// Durable timing file. Every sample is written through immediately.
#[derive(Debug, Clone)]
pub struct TimingStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl TimingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(path, Arc::new(RealFileSystem))
    }

    pub fn with_fs(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one sample for `stage`.
    pub fn record(&self, stage: &str, elapsed: Duration) -> Result<()> {
        self.record_secs(stage, elapsed.as_secs_f64())
    }

    pub fn record_secs(&self, stage: &str, secs: f64) -> Result<()> {
        let mut timings = self.load()?;
        let sample = format_sample(secs);

        match timings.iter_mut().find(|(id, _)| id == stage) {
            Some((_, samples)) => samples.push(sample.clone()),
            None => timings.push((stage.to_string(), vec![sample.clone()])),
        }

        self.save(&timings)?;
        info!(stage, seconds = %sample, path = %self.path.display(), "recorded stage timing");
        Ok(())
    }

    /// Samples recorded so far for `stage`.
    pub fn samples(&self, stage: &str) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|(id, _)| id == stage)
            .map(|(_, samples)| samples)
            .unwrap_or_default())
    }

    /// Read the whole file. A missing file is an empty record; blank lines and
    /// lines containing `#` are ignored.
    pub fn load(&self) -> Result<TimingRecord> {
        if !self.fs.is_file(&self.path) {
            return Ok(Vec::new());
        }

        let contents = self.fs.read_to_string(&self.path)?;
        let mut timings: TimingRecord = Vec::new();

        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.contains('#') {
                continue;
            }
            let mut fields = trimmed.split(',').map(str::trim);
            let Some(stage) = fields.next() else {
                continue;
            };
            let samples: Vec<String> = fields
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();

            // A stage listed twice keeps its samples in file order.
            match timings.iter_mut().find(|(id, _)| id == stage) {
                Some((_, existing)) => existing.extend(samples),
                None => timings.push((stage.to_string(), samples)),
            }
        }

        Ok(timings)
    }

    fn save(&self, timings: &TimingRecord) -> Result<()> {
        let mut out = String::new();
        for (stage, samples) in timings {
            out.push_str(stage);
            for sample in samples {
                out.push(',');
                out.push_str(sample);
            }
            out.push('\n');
        }
        self.fs.write(&self.path, out.as_bytes())?;
        Ok(())
    }
}

/// Fixed two-decimal seconds, e.g. `1.23`.
pub fn format_sample(secs: f64) -> String {
    format!("{:.2}", secs)
}
