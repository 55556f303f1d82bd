use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use stagedag::dag::DependencyGraph;
use stagedag::exec::NoOp;

// Strategy to generate a valid DAG as (stage index -> dependency indices).
// We ensure acyclicity by only allowing stage N to depend on stages 0..N-1.
fn dag_strategy(max_stages: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_stages).prop_flat_map(|num_stages| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_stages,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        Vec::new()
                    } else {
                        deps.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect::<Vec<Vec<usize>>>()
        })
    })
}

fn name(i: usize) -> String {
    format!("stage_{i}")
}

fn build(deps: &[Vec<usize>]) -> DependencyGraph<NoOp> {
    let mut builder = DependencyGraph::builder();
    for (i, ds) in deps.iter().enumerate() {
        builder.add_node(name(i), ds.iter().map(|d| name(*d)), NoOp);
    }
    builder.build().expect("generated graphs are acyclic")
}

/// Every stage reachable from `target`, including itself.
fn closure(deps: &[Vec<usize>], target: usize) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![target];
    while let Some(i) = stack.pop() {
        if seen.insert(name(i)) {
            stack.extend(deps[i].iter().copied());
        }
    }
    seen
}

proptest! {
    #[test]
    fn order_is_topological_and_exactly_the_closure(
        deps in dag_strategy(24),
        target_seed in any::<usize>(),
    ) {
        let graph = build(&deps);
        let target = target_seed % deps.len();
        let target_id = name(target);
        let order = graph.resolve(&target_id).unwrap();

        // Each stage appears once.
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());

        // Exactly the target and its transitive dependencies.
        let expected = closure(&deps, target);
        let got: HashSet<String> = order.iter().cloned().collect();
        prop_assert_eq!(&got, &expected);

        // The target comes last.
        prop_assert_eq!(order.last(), Some(&target_id));

        // Every dependency runs before its dependent.
        let position: HashMap<&String, usize> =
            order.iter().enumerate().map(|(p, id)| (id, p)).collect();
        for id in &order {
            for dep in graph.dependencies_of(id) {
                prop_assert!(
                    position[dep] < position[id],
                    "{} must run before {}", dep, id
                );
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(deps in dag_strategy(16)) {
        let target = name(deps.len() - 1);
        let first = build(&deps).resolve(&target).unwrap();
        let second = build(&deps).resolve(&target).unwrap();
        prop_assert_eq!(first, second);
    }
}
