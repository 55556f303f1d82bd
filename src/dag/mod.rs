// src/dag/mod.rs

//! Stage dependency graph.
//!
//! - [`graph`] holds the validated `DependencyGraph` of `Node`s and its builder
//!   (unknown dependencies, self-dependencies and cycles are rejected there).
//! - [`resolve`] turns a target id into the execution order of its
//!   transitive dependencies.

pub mod graph;
pub mod resolve;

pub use graph::{DependencyGraph, DependencyGraphBuilder, Node};
pub use resolve::resolve_order;
