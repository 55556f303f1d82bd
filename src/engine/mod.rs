// src/engine/mod.rs

//! Execution engine.
//!
//! The engine is single-threaded and strictly sequential: it blocks on each
//! stage until it completes before starting the next one in resolved order.
//! Whatever parallelism a stage uses internally is invisible to it.
//!
//! The pure state machine lives in [`core`]; the async shell that invokes
//! stages and writes the ledger and timing store is [`runtime`].

use std::time::Duration;

use crate::types::{StageId, StageResult};

pub mod core;
pub mod runtime;

pub use self::core::{PipelineRun, PipelineState, StageState, StageStep};
pub use runtime::{execute, Engine};

/// Per-stage results of a completed run, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// The resolved execution order.
    pub order: Vec<StageId>,
    pub outcomes: Vec<(StageId, StageResult)>,
    /// Wall-clock time of each invocation.
    pub durations: Vec<(StageId, Duration)>,
}

impl PipelineReport {
    pub fn new(order: Vec<StageId>) -> Self {
        Self {
            order,
            outcomes: Vec::new(),
            durations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, stage: &str, result: StageResult, elapsed: Duration) {
        self.outcomes.push((stage.to_string(), result));
        self.durations.push((stage.to_string(), elapsed));
    }

    pub fn result_of(&self, stage: &str) -> Option<StageResult> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == stage)
            .map(|(_, result)| *result)
    }

    /// Stages that actually did work.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, r)| *r == StageResult::Success)
            .map(|(id, _)| id.as_str())
    }

    /// Stages that reported "nothing to do".
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, r)| *r == StageResult::Skipped)
            .map(|(id, _)| id.as_str())
    }
}
