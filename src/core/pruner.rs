//! Sink/source removal.
//!
//! A node with no incoming edges (source) or no outgoing edges (sink)
//! cannot be balanced against its neighbors. Removal detaches its edges,
//! which can turn neighbors into new sinks or sources, so the scan repeats
//! until a full pass removes nothing.

use crate::core::graph::{DemandGraph, NodeId};

#[derive(Debug, Clone, Default)]
pub struct PruneOutcome {
    pub removed: Vec<NodeId>,
    pub removed_operations: f64,
}

pub fn remove_sinks_and_sources(graph: &mut DemandGraph) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();
    let ops_before = graph.removed_ops_total();

    loop {
        let candidates: Vec<NodeId> = graph
            .active_nodes()
            .filter(|&id| graph.node(id).is_source_or_sink())
            .collect();

        if candidates.is_empty() {
            break;
        }

        for id in candidates {
            // A node may have lost its last edge to an earlier removal in
            // this same pass; re-check before detaching.
            if !graph.node(id).removed && graph.node(id).is_source_or_sink() {
                graph.detach_node(id);
                outcome.removed.push(id);
            }
        }
    }

    outcome.removed_operations = graph.removed_ops_total() - ops_before;
    if !outcome.removed.is_empty() {
        tracing::debug!(
            "pruned {} sink/source airports ({} operations detached)",
            outcome.removed.len(),
            outcome.removed_operations
        );
    }

    outcome
}
