//! Dataflow scheduling.
//!
//! Blocks are ordered with Kahn's algorithm so that every block generates code
//! after the blocks driving its inputs. Connections into a memory-bearing
//! block are not dependencies: such a block reads its memory in the main
//! section and writes it in the output section, which renders after every
//! main section, so it may run before its driver. That is what lets a delay
//! close a feedback loop.
//!
//! Among blocks that are ready at the same time, the one earliest in the
//! document goes first, so the schedule is a pure function of the graph.

use std::collections::{BTreeMap, BTreeSet};

use spindle_core::Graph;

/// Outcome of a failed sort: the blocks on (or between) dependency cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CycleError {
    pub(crate) blocks: Vec<String>,
}

/// Sorts `blocks` (ids in document order) by dataflow dependency.
///
/// `memory_bearing(id)` tells which blocks break dependencies on their inputs.
pub(crate) fn schedule(
    graph: &Graph,
    blocks: &[&str],
    memory_bearing: impl Fn(&str) -> bool,
) -> Result<Vec<usize>, CycleError> {
    let n = blocks.len();
    let position: BTreeMap<&str, usize> = blocks.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for conn in &graph.connections {
        let (Some(&from), Some(&to)) = (
            position.get(conn.from.block_id.as_str()),
            position.get(conn.to.block_id.as_str()),
        ) else {
            continue;
        };
        if memory_bearing(blocks[to]) {
            continue;
        }
        outgoing[from].push(to);
        in_degree[to] += 1;
    }

    // Seed with zero in-degree blocks; BTreeSet pops the lowest index.
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(n);

    while let Some(idx) = ready.pop_first() {
        sorted.push(idx);
        for &to in &outgoing[idx] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.insert(to);
            }
        }
    }

    if sorted.len() == n {
        return Ok(sorted);
    }

    // What remains is every cycle plus whatever hangs off them downstream.
    // Peel off blocks with no remaining successor to keep only the cycles.
    let mut remaining: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
    loop {
        let sinks: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| !outgoing[i].iter().any(|t| remaining.contains(t)))
            .collect();
        if sinks.is_empty() {
            break;
        }
        for s in sinks {
            remaining.remove(&s);
        }
    }

    Err(CycleError {
        blocks: remaining.into_iter().map(|i| blocks[i].to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::BlockInstance;

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.blocks.iter().map(|b| b.id.as_str()).collect()
    }

    fn order(graph: &Graph, delays: &[&str]) -> Result<Vec<String>, CycleError> {
        let blocks = ids(graph);
        schedule(graph, &blocks, |id| delays.contains(&id))
            .map(|o| o.into_iter().map(|i| blocks[i].to_string()).collect())
    }

    fn graph(blocks: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new("t");
        for b in blocks {
            g = g.with_block(BlockInstance::new(*b, "x"));
        }
        for (from, to) in edges {
            g = g.with_connection(from, "out", to, "in");
        }
        g
    }

    #[test]
    fn drivers_come_first() {
        let g = graph(&["dac", "gain", "adc"], &[("adc", "gain"), ("gain", "dac")]);
        assert_eq!(order(&g, &[]).unwrap(), ["adc", "gain", "dac"]);
    }

    #[test]
    fn ties_break_by_document_order() {
        let g = graph(&["b", "a", "c"], &[]);
        assert_eq!(order(&g, &[]).unwrap(), ["b", "a", "c"]);
        let g = graph(&["src", "y", "x"], &[("src", "x"), ("src", "y")]);
        assert_eq!(order(&g, &[]).unwrap(), ["src", "y", "x"]);
    }

    #[test]
    fn cycles_are_reported_without_downstream_blocks() {
        let g = graph(
            &["a", "b", "c", "tail"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "tail")],
        );
        let err = order(&g, &[]).unwrap_err();
        assert_eq!(err.blocks, ["a", "b", "c"]);
    }

    #[test]
    fn memory_blocks_break_cycles() {
        let g = graph(
            &["adc", "mix", "delay", "dac"],
            &[("adc", "mix"), ("mix", "delay"), ("delay", "mix"), ("mix", "dac")],
        );
        assert_eq!(
            order(&g, &["delay"]).unwrap(),
            ["adc", "delay", "mix", "dac"]
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&["a"], &[("a", "a")]);
        assert_eq!(order(&g, &[]).unwrap_err().blocks, ["a"]);
    }
}
