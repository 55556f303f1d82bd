// src/record/ledger.rs

//! Durable run ledger.
//!
//! Plain text, one event per line:
//!
//! ```text
//! 2024-05-01T10:00:00 | START_PIPELINE
//! 2024-05-01T10:00:00 | START subtract
//! 2024-05-01T13:12:41 | END subtract
//! ```
//!
//! Every line is flushed and synced before `record` returns, so a run that is
//! killed mid-stage leaves a trailing `START <id>` with no matching
//! `END`/`FAIL`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDateTime};
use tracing::debug;

use crate::errors::Result;
use crate::types::{LedgerMode, StageId};

/// Timestamp format used in ledger lines.
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Lifecycle event recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    StartPipeline,
    Start(StageId),
    End(StageId),
    Fail(StageId),
    EndWithoutRun(StageId),
    PipelineSuccess,
    PipelineFailure,
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::StartPipeline => "START_PIPELINE",
            LedgerEvent::Start(_) => "START",
            LedgerEvent::End(_) => "END",
            LedgerEvent::Fail(_) => "FAIL",
            LedgerEvent::EndWithoutRun(_) => "END_WITHOUT_RUN",
            LedgerEvent::PipelineSuccess => "PIPELINE_SUCCESS",
            LedgerEvent::PipelineFailure => "PIPELINE_FAILURE",
        }
    }

    pub fn stage(&self) -> Option<&str> {
        match self {
            LedgerEvent::Start(id)
            | LedgerEvent::End(id)
            | LedgerEvent::Fail(id)
            | LedgerEvent::EndWithoutRun(id) => Some(id.as_str()),
            LedgerEvent::StartPipeline
            | LedgerEvent::PipelineSuccess
            | LedgerEvent::PipelineFailure => None,
        }
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(id) => write!(f, "{} {}", self.kind(), id),
            None => write!(f, "{}", self.kind()),
        }
    }
}

impl FromStr for LedgerEvent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, stage) = match s.split_once(' ') {
            Some((kind, stage)) => (kind, Some(stage.trim().to_string())),
            None => (s, None),
        };

        match (kind, stage) {
            ("START_PIPELINE", None) => Ok(LedgerEvent::StartPipeline),
            ("PIPELINE_SUCCESS", None) => Ok(LedgerEvent::PipelineSuccess),
            ("PIPELINE_FAILURE", None) => Ok(LedgerEvent::PipelineFailure),
            ("START", Some(id)) => Ok(LedgerEvent::Start(id)),
            ("END", Some(id)) => Ok(LedgerEvent::End(id)),
            ("FAIL", Some(id)) => Ok(LedgerEvent::Fail(id)),
            ("END_WITHOUT_RUN", Some(id)) => Ok(LedgerEvent::EndWithoutRun(id)),
            _ => Err(anyhow!("unrecognised ledger event: {s:?}")),
        }
    }
}

/// One timestamped ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub timestamp: NaiveDateTime,
    pub event: LedgerEvent,
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {}",
            self.timestamp.format(LEDGER_TIMESTAMP_FORMAT),
            self.event
        )
    }
}

impl FromStr for LedgerEntry {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let (ts, event) = line
            .split_once(" | ")
            .ok_or_else(|| anyhow!("malformed ledger line: {line:?}"))?;
        let timestamp = NaiveDateTime::parse_from_str(ts.trim(), LEDGER_TIMESTAMP_FORMAT)
            .with_context(|| format!("parsing ledger timestamp {ts:?}"))?;
        Ok(LedgerEntry {
            timestamp,
            event: event.parse()?,
        })
    }
}

/// Append-only, flush-per-write event log for one pipeline run.
#[derive(Debug)]
pub struct RunLedger {
    path: PathBuf,
    file: File,
    entries: Vec<LedgerEntry>,
}

impl RunLedger {
    /// Open the ledger file. `Truncate` discards previous runs; `Append` keeps them.
    pub fn open(path: impl Into<PathBuf>, mode: LedgerMode) -> Result<Self> {
        let path = path.into();
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            LedgerMode::Truncate => options.write(true).truncate(true),
            LedgerMode::Append => options.append(true),
        };
        let file = options
            .open(&path)
            .with_context(|| format!("opening ledger file {:?}", path))?;

        Ok(Self {
            path,
            file,
            entries: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written by this instance, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Append `event` stamped with the current local time and make it durable.
    pub fn record(&mut self, event: LedgerEvent) -> Result<()> {
        let entry = LedgerEntry {
            timestamp: Local::now().naive_local(),
            event,
        };
        writeln!(self.file, "{}", entry)
            .with_context(|| format!("writing ledger file {:?}", self.path))?;
        self.file.flush()?;
        self.file
            .sync_data()
            .with_context(|| format!("syncing ledger file {:?}", self.path))?;
        debug!(entry = %entry, "ledger");
        self.entries.push(entry);
        Ok(())
    }
}

/// Parse every line of a ledger file. Blank lines are ignored.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading ledger file {:?}", path))?;
    let mut entries = Vec::new();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        entries.push(line.parse::<LedgerEntry>()?);
    }
    Ok(entries)
}

/// The stage that was running when the last recorded run stopped, if it was
/// interrupted: a `START <id>` with nothing after it.
pub fn interrupted_stage(entries: &[LedgerEntry]) -> Option<&str> {
    match entries.last().map(|e| &e.event) {
        Some(LedgerEvent::Start(id)) => Some(id.as_str()),
        _ => None,
    }
}
