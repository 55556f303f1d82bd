// src/engine/runtime.rs

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::dag::DependencyGraph;
use crate::errors::{Result, StagedagError};
use crate::exec::Runnable;
use crate::record::{RunLedger, TimingStore};
use crate::types::StageResult;

use super::core::PipelineRun;
use super::PipelineReport;

/// Walks a resolved order strictly sequentially, invoking one stage at a
/// time and recording everything in the ledger and the timing store.
///
/// This is the IO shell around [`PipelineRun`], which owns the state
/// machine. The first failing stage aborts the whole run: nothing else is
/// attempted, not even stages independent of the failed one.
pub struct Engine {
    ledger: RunLedger,
    timing: Option<TimingStore>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("ledger", &self.ledger.path())
            .field("timing", &self.timing.as_ref().map(|t| t.path()))
            .finish()
    }
}

impl Engine {
    pub fn new(ledger: RunLedger) -> Self {
        Self {
            ledger,
            timing: None,
        }
    }

    pub fn with_timing(mut self, timing: TimingStore) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Run `target` and everything it transitively depends on.
    ///
    /// Returns `StageFailed` after writing `FAIL <id>` and `PIPELINE_FAILURE`
    /// if any stage fails.
    pub async fn run<R: Runnable>(
        &mut self,
        graph: &mut DependencyGraph<R>,
        target: &str,
    ) -> Result<PipelineReport> {
        let order = graph.resolve(target)?;
        let mut run = PipelineRun::new(order.clone());
        let mut report = PipelineReport::new(order.clone());

        self.ledger.record(run.start()?)?;
        info!(pipeline_target = %target, stages = order.len(), ?order, "pipeline started");

        for id in &order {
            self.ledger.record(run.begin_stage(id)?)?;
            info!(stage = %id, "executing stage");

            let node = graph
                .node_mut(id)
                .ok_or_else(|| StagedagError::StageNotFound(id.clone()))?;

            let started = Instant::now();
            let result = match node.runnable.invoke().await {
                Ok(result) => result,
                Err(err) => {
                    error!(stage = %id, error = %err, "stage could not be run");
                    StageResult::Failed(-1)
                }
            };
            let elapsed = started.elapsed();

            let step = run.finish_stage(id, result)?;
            for event in step.events {
                self.ledger.record(event)?;
            }
            report.push(id, result, elapsed);

            match result {
                StageResult::Success => info!(
                    stage = %id,
                    hours = %format!("{:.2}", elapsed.as_secs_f64() / 3600.0),
                    "stage finished"
                ),
                StageResult::Skipped => info!(stage = %id, "stage skipped"),
                StageResult::Failed(code) => error!(stage = %id, code, "stage failed"),
            }

            if step.record_timing {
                self.record_timing(id, elapsed);
            }

            if step.abort {
                let code = match result {
                    StageResult::Failed(code) => code,
                    _ => -1,
                };
                error!(stage = %id, "pipeline failed; aborting remaining stages");
                return Err(StagedagError::StageFailed {
                    stage: id.clone(),
                    code,
                });
            }
        }

        self.ledger.record(run.finish()?)?;
        info!(pipeline_target = %target, "pipeline succeeded");
        Ok(report)
    }

    /// Timings are history only; a failed write never changes the outcome.
    fn record_timing(&self, stage: &str, elapsed: Duration) {
        match &self.timing {
            Some(timing) => {
                if let Err(err) = timing.record(stage, elapsed) {
                    warn!(
                        stage,
                        path = %timing.path().display(),
                        error = %err,
                        "could not record stage timing"
                    );
                }
            }
            None => debug!(stage, "no timing store configured; duration not recorded"),
        }
    }
}

/// Drive `graph` to `target` with a one-off engine.
pub async fn execute<R: Runnable>(
    graph: &mut DependencyGraph<R>,
    target: &str,
    ledger: RunLedger,
    timing: Option<TimingStore>,
) -> Result<PipelineReport> {
    let mut engine = Engine::new(ledger);
    if let Some(timing) = timing {
        engine = engine.with_timing(timing);
    }
    engine.run(graph, target).await
}
