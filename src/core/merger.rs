//! Final schedule assembly.
//!
//! Concatenates, in order: the retained baseline flights (minus those the
//! cloner removed on shrinking pairs), the generated clones, the pruned
//! airports' original flights passed through unchanged, and the synthetic
//! VFR records. Uniqueness of ids is guaranteed by the producing stages,
//! so no deduplication happens here.

use crate::core::cloner::CloneOutcome;
use crate::core::graph::DemandGraph;
use crate::domain::model::ScheduleRecord;

pub fn merge(
    graph: &DemandGraph,
    clones: &CloneOutcome,
    vfr_flights: &[ScheduleRecord],
) -> Vec<ScheduleRecord> {
    let mut results = Vec::new();

    // Retained flights, in edge insertion order.
    for edge_id in graph.active_edges() {
        for &flight_id in &graph.edge(edge_id).flights {
            let record = graph.flight(flight_id);
            if !clones.has_removed(record) {
                results.push(record.clone());
            }
        }
    }

    results.extend(clones.cloned.iter().cloned());

    // Pruned demand passes through unchanged; it was never rebalanced.
    for edge_id in graph.edge_ids() {
        let edge = graph.edge(edge_id);
        if edge.detached {
            for &flight_id in &edge.flights {
                results.push(graph.flight(flight_id).clone());
            }
        }
    }

    results.extend(vfr_flights.iter().cloned());

    results
}
