// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runnable`] defines the `Runnable` contract the engine drives, plus the
//!   `NoOp` body of the synthetic endpoint.
//! - [`task`] binds a stage program, its `--name=value` arguments and its
//!   working directory, and runs it through `sh -c`.
//! - [`env`] wraps a command for a bare shell, a container or an activated
//!   conda environment.
//! - [`shell`] has the quoting helpers shared by the above.
//! - [`pbs`] writes batch submission scripts for cluster schedulers.

pub mod env;
pub mod pbs;
pub mod runnable;
pub mod shell;
pub mod task;

pub use env::EnvironmentComposer;
pub use runnable::{InvokeFuture, NoOp, Runnable};
pub use task::Task;
