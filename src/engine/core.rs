// src/engine/core.rs

//! Pure per-run state machine.
//!
//! [`PipelineRun`] tracks the pipeline state and the state of every stage in
//! the resolved order, rejects illegal transitions, and tells the IO shell
//! (`engine::runtime::Engine`) which ledger events to write and whether to
//! stop. It performs no IO and knows nothing about processes or files.

use std::collections::HashMap;

use anyhow::anyhow;

use crate::errors::{Result, StagedagError};
use crate::record::LedgerEvent;
use crate::types::{StageId, StageResult};

/// Per-stage state within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Skipped,
    Failed(i32),
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StageState::Pending | StageState::Running)
    }
}

/// Pipeline-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// What the shell should do after a stage finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStep {
    /// Ledger events to write, in order.
    pub events: Vec<LedgerEvent>,
    /// Whether the measured duration goes into the timing store.
    pub record_timing: bool,
    /// Whether the whole run must stop now.
    pub abort: bool,
}

/// State of one engine run over a resolved order.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    order: Vec<StageId>,
    states: HashMap<StageId, StageState>,
    pipeline: PipelineState,
    /// Index of the next stage to begin.
    cursor: usize,
}

impl PipelineRun {
    pub fn new(order: Vec<StageId>) -> Self {
        let states = order
            .iter()
            .map(|id| (id.clone(), StageState::Pending))
            .collect();
        Self {
            order,
            states,
            pipeline: PipelineState::NotStarted,
            cursor: 0,
        }
    }

    pub fn order(&self) -> &[StageId] {
        &self.order
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline
    }

    pub fn state_of(&self, stage: &str) -> Option<StageState> {
        self.states.get(stage).copied()
    }

    /// Next stage to begin, if any remain.
    pub fn next_stage(&self) -> Option<&str> {
        self.order.get(self.cursor).map(|s| s.as_str())
    }

    /// `NotStarted → Running`.
    pub fn start(&mut self) -> Result<LedgerEvent> {
        if self.pipeline != PipelineState::NotStarted {
            return Err(illegal(format!(
                "cannot start a pipeline run in state {:?}",
                self.pipeline
            )));
        }
        self.pipeline = PipelineState::Running;
        Ok(LedgerEvent::StartPipeline)
    }

    /// `Pending → Running` for the next stage in order.
    pub fn begin_stage(&mut self, stage: &str) -> Result<LedgerEvent> {
        if self.pipeline != PipelineState::Running {
            return Err(illegal(format!(
                "cannot begin stage '{stage}' while the pipeline is {:?}",
                self.pipeline
            )));
        }
        if self.next_stage() != Some(stage) {
            return Err(illegal(format!(
                "stage '{stage}' is out of order (next is {:?})",
                self.next_stage()
            )));
        }
        self.transition(stage, StageState::Pending, StageState::Running)?;
        self.cursor += 1;
        Ok(LedgerEvent::Start(stage.to_string()))
    }

    /// `Running → Succeeded | Skipped | Failed`.
    ///
    /// A failure also moves the pipeline to `Failed` and asks the shell to abort.
    pub fn finish_stage(&mut self, stage: &str, result: StageResult) -> Result<StageStep> {
        let id = stage.to_string();
        let step = match result {
            StageResult::Success => {
                self.transition(stage, StageState::Running, StageState::Succeeded)?;
                StageStep {
                    events: vec![LedgerEvent::End(id)],
                    record_timing: true,
                    abort: false,
                }
            }
            StageResult::Skipped => {
                self.transition(stage, StageState::Running, StageState::Skipped)?;
                StageStep {
                    events: vec![LedgerEvent::EndWithoutRun(id)],
                    record_timing: false,
                    abort: false,
                }
            }
            StageResult::Failed(code) => {
                self.transition(stage, StageState::Running, StageState::Failed(code))?;
                self.pipeline = PipelineState::Failed;
                StageStep {
                    events: vec![LedgerEvent::Fail(id), LedgerEvent::PipelineFailure],
                    record_timing: false,
                    abort: true,
                }
            }
        };
        Ok(step)
    }

    /// `Running → Succeeded`, once every stage is terminal.
    pub fn finish(&mut self) -> Result<LedgerEvent> {
        if self.pipeline != PipelineState::Running {
            return Err(illegal(format!(
                "cannot finish a pipeline run in state {:?}",
                self.pipeline
            )));
        }
        if let Some(open) = self
            .order
            .iter()
            .find(|id| !self.states[id.as_str()].is_terminal())
        {
            return Err(illegal(format!(
                "cannot finish pipeline run: stage '{open}' has not completed"
            )));
        }
        self.pipeline = PipelineState::Succeeded;
        Ok(LedgerEvent::PipelineSuccess)
    }

    fn transition(&mut self, stage: &str, from: StageState, to: StageState) -> Result<()> {
        let state = self
            .states
            .get_mut(stage)
            .ok_or_else(|| StagedagError::StageNotFound(stage.to_string()))?;
        if *state != from {
            return Err(illegal(format!(
                "stage '{stage}' cannot move from {:?} to {:?}",
                *state, to
            )));
        }
        *state = to;
        Ok(())
    }
}

fn illegal(msg: String) -> StagedagError {
    StagedagError::Other(anyhow!(msg))
}
