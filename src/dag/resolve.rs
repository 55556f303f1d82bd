// src/dag/resolve.rs

//! Iterative depth-first resolution of a target's execution order.
//!
//! No recursion: pipeline depth is data-driven and must not be bounded by
//! the call stack.

use std::collections::HashSet;

use crate::types::StageId;

/// Compute the execution order for `target` over an acyclic relation.
///
/// Walks a LIFO work queue seeded with `target`. Each newly seen node pushes
/// its dependencies in declared order (so the last-declared one is explored
/// first), retires every trailing `path` entry it is not a dependency of into
/// `finished`, and then joins `path`. `path` therefore always reads as a
/// dependency chain starting at `target`.
///
/// `path` followed by reversed `finished` lists dependents before their
/// dependencies; the execution order is that sequence reversed.
///
/// Unknown ids are treated as having no dependencies; callers validate first.
pub fn resolve_order<'a, F>(target: &str, deps_of: F) -> Vec<StageId>
where
    F: Fn(&str) -> &'a [StageId],
{
    let mut seen: HashSet<StageId> = HashSet::new();
    let mut path: Vec<StageId> = Vec::new();
    let mut finished: Vec<StageId> = Vec::new();
    let mut queue: Vec<StageId> = vec![target.to_string()];

    while let Some(v) = queue.pop() {
        if seen.contains(&v) {
            continue;
        }
        seen.insert(v.clone());
        queue.extend(deps_of(&v).iter().cloned());

        while let Some(top) = path.last() {
            if deps_of(top).contains(&v) {
                break;
            }
            if let Some(done) = path.pop() {
                finished.push(done);
            }
        }
        path.push(v);
    }

    // Execution order = reverse(path ++ reverse(finished)) = finished ++ reverse(path).
    finished.extend(path.into_iter().rev());
    finished
}
