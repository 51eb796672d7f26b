//! Deterministic ordering of the module dependency graph.
//!
//! The graph is a mapping from a node to its direct dependencies. It may be
//! cyclic and may mention nodes that never appear as keys. Ordering is a
//! depth-first post-order over sorted keys and sorted adjacency lists, so the
//! same graph always yields the same order no matter how it was built.
//!
//! Cycles are tolerated: a node is marked visited before its dependencies are
//! walked, so traversal terminates, but members of a cycle come out in
//! first-encountered order rather than a true dependency-first order. Callers
//! that need a guarantee use [`sort_strict`] or [`find_cycles`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::resolver::errors::GraphError;

/// Direction of a sorted module list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Dependencies before dependents
    #[default]
    Ascending,
    /// Dependents before dependencies
    Descending,
}

/// Sort a dependency graph.
///
/// The output contains every node reachable from the keys exactly once.
pub fn sort<'a, K, V, G>(graph: G, order: SortOrder) -> Vec<K>
where
    K: Ord + Clone + 'a,
    V: AsRef<[K]> + 'a,
    G: IntoIterator<Item = (&'a K, &'a V)>,
{
    let adjacency = normalize(graph);

    let mut visited: BTreeSet<&K> = BTreeSet::new();
    let mut sorted = Vec::with_capacity(adjacency.len());
    // (node, index of the next dependency to visit)
    let mut stack: Vec<(&K, usize)> = Vec::new();

    for &root in adjacency.keys() {
        if !visited.insert(root) {
            continue;
        }
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let deps = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if let Some(&next) = deps.get(frame.1) {
                frame.1 += 1;
                if visited.insert(next) {
                    stack.push((next, 0));
                }
            } else {
                stack.pop();
                sorted.push(node.clone());
            }
        }
    }

    if order == SortOrder::Descending {
        sorted.reverse();
    }
    sorted
}

/// Sort a dependency graph, failing if it contains a cycle.
pub fn sort_strict<'a, K, V, G>(graph: G, order: SortOrder) -> Result<Vec<K>, GraphError>
where
    K: Ord + Clone + Display + 'a,
    V: AsRef<[K]> + 'a,
    G: IntoIterator<Item = (&'a K, &'a V)> + Copy,
{
    if let Some(err) = GraphError::from_cycles(&find_cycles(graph)) {
        return Err(err);
    }
    Ok(sort(graph, order))
}

/// Find every cycle (strongly connected component with more than one node,
/// or a node depending on itself).
///
/// Members of each cycle are sorted, and cycles are sorted by their first
/// member, so the result is stable.
pub fn find_cycles<'a, K, V, G>(graph: G) -> Vec<Vec<String>>
where
    K: Ord + Display + 'a,
    V: AsRef<[K]> + 'a,
    G: IntoIterator<Item = (&'a K, &'a V)>,
{
    let adjacency = normalize(graph);

    let mut pg: DiGraph<&K, ()> = DiGraph::new();
    let mut index: BTreeMap<&K, NodeIndex> = BTreeMap::new();
    for (&node, deps) in &adjacency {
        for &n in std::iter::once(&node).chain(deps.iter()) {
            index.entry(n).or_insert_with(|| pg.add_node(n));
        }
    }
    for (node, deps) in &adjacency {
        for dep in deps {
            pg.add_edge(index[node], index[dep], ());
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&pg)
        .into_iter()
        .filter(|scc| scc.len() > 1 || pg.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<&K> = scc.iter().map(|&n| pg[n]).collect();
            members.sort();
            members.iter().map(|k| k.to_string()).collect()
        })
        .collect();

    cycles.sort();
    cycles
}

/// Collect the graph into sorted keys with sorted, deduplicated adjacency.
fn normalize<'a, K, V, G>(graph: G) -> BTreeMap<&'a K, Vec<&'a K>>
where
    K: Ord + 'a,
    V: AsRef<[K]> + 'a,
    G: IntoIterator<Item = (&'a K, &'a V)>,
{
    graph
        .into_iter()
        .map(|(node, deps)| {
            let mut deps: Vec<&K> = deps.as_ref().iter().collect();
            deps.sort();
            deps.dedup();
            (node, deps)
        })
        .collect()
}
