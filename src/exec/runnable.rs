// src/exec/runnable.rs

//! The invocation contract the engine drives.
//!
//! The engine only ever calls [`Runnable::invoke`] and interprets the
//! returned [`StageResult`]. Production stages are [`Task`](super::Task)s
//! that spawn a shell process; tests can provide their own implementation
//! that records calls and returns canned results.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::StageResult;

/// Boxed future returned by [`Runnable::invoke`].
pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = Result<StageResult>> + Send + 'a>>;

/// A deferred stage body.
pub trait Runnable: Send {
    /// Run the stage to completion and report how it went.
    ///
    /// An `Err` means the stage could not even be attempted (e.g. the
    /// process failed to spawn); the engine records it as a failure.
    fn invoke(&mut self) -> InvokeFuture<'_>;

    /// Human-readable description for dry runs, if there is one.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Runnable that never does any work and always reports `Skipped`.
///
/// Used for the synthetic `endpoint` node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl Runnable for NoOp {
    fn invoke(&mut self) -> InvokeFuture<'_> {
        Box::pin(async { Ok(StageResult::Skipped) })
    }
}

impl<R: Runnable + ?Sized> Runnable for Box<R> {
    fn invoke(&mut self) -> InvokeFuture<'_> {
        (**self).invoke()
    }

    fn describe(&self) -> Option<String> {
        (**self).describe()
    }
}
