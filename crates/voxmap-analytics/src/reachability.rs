//! Depth-bounded reachability around a target word.

use std::collections::BTreeSet;

use crate::graph::WordGraph;

/// Subgraph induced on every node within `max_depth` hops of `target`.
///
/// Returns `None` when `target` is not a node of `graph`. With
/// `max_depth = 0` the result is the target alone, without edges.
/// Expansion stops early once a round discovers no new node.
pub fn extract_reachable(graph: &WordGraph, target: &str, max_depth: usize) -> Option<WordGraph> {
    if !graph.contains_node(target) {
        return None;
    }

    let mut visited: BTreeSet<String> = BTreeSet::new();
    visited.insert(target.to_string());
    let mut frontier: Vec<String> = vec![target.to_string()];
    let mut depth = 0;

    while !frontier.is_empty() && depth < max_depth {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            for neighbor in graph.neighbors(node) {
                if visited.insert(neighbor.to_string()) {
                    next_frontier.push(neighbor.to_string());
                }
            }
        }
        frontier = next_frontier;
        depth += 1;
    }

    tracing::debug!(
        word = target,
        max_depth,
        rounds = depth,
        reached = visited.len(),
        "Reachable subgraph extracted"
    );

    Some(graph.induced_subgraph(&visited))
}
