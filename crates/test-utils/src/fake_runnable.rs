use std::sync::{Arc, Mutex};

use stagedag::errors::StagedagError;
use stagedag::exec::{InvokeFuture, Runnable};
use stagedag::types::StageResult;

/// What a [`FakeRunnable`] reports when invoked.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Result(StageResult),
    /// Behave like a stage whose process could not be spawned.
    Error(String),
}

/// A fake stage body that:
/// - records its name into a shared log when invoked
/// - immediately reports a canned outcome.
pub struct FakeRunnable {
    name: String,
    outcome: FakeOutcome,
    invoked: Arc<Mutex<Vec<String>>>,
}

impl FakeRunnable {
    pub fn new(name: &str, result: StageResult, invoked: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            outcome: FakeOutcome::Result(result),
            invoked,
        }
    }

    pub fn success(name: &str, invoked: Arc<Mutex<Vec<String>>>) -> Self {
        Self::new(name, StageResult::Success, invoked)
    }

    pub fn unspawnable(name: &str, invoked: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            outcome: FakeOutcome::Error(format!("cannot spawn {name}")),
            invoked,
        }
    }
}

impl Runnable for FakeRunnable {
    fn invoke(&mut self) -> InvokeFuture<'_> {
        let name = self.name.clone();
        let outcome = self.outcome.clone();
        let invoked = Arc::clone(&self.invoked);

        Box::pin(async move {
            invoked.lock().unwrap().push(name);
            match outcome {
                FakeOutcome::Result(result) => Ok(result),
                FakeOutcome::Error(msg) => Err::<StageResult, _>(StagedagError::Other(
                    anyhow::anyhow!(msg),
                )),
            }
        })
    }

    fn describe(&self) -> Option<String> {
        Some(format!("fake {}", self.name))
    }
}

/// Shorthand for the shared invocation log.
pub fn invocation_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn invoked(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}
