//! Largest-remainder integerization of the balanced flows.
//!
//! Fratar leaves each city pair with a continuous target flow. Schedules
//! need whole flights, so each edge keeps the integer part of its target
//! and the leftover units are handed out one at a time to the edges with
//! the largest fractional remainders (Hare quota), ties broken by edge
//! insertion order. Shortfalls are computed per node by default, or once
//! across the whole graph when configured globally.

use crate::core::graph::{DemandGraph, EdgeId, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApportionScope {
    #[default]
    PerNode,
    Global,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IntegerizerConfig {
    pub scope: ApportionScope,
}

pub fn integerize(graph: &mut DemandGraph, config: &IntegerizerConfig) {
    set_initial_integer_data(graph);

    match config.scope {
        ApportionScope::PerNode => distribute_per_node(graph),
        ApportionScope::Global => distribute_globally(graph),
    }

    let edges: Vec<_> = graph.active_edges().collect();
    for edge_id in edges {
        let edge = graph.edge_mut(edge_id);
        edge.clones_to_make = (edge.target_final - edge.baseline_count() as i64).max(0);
    }
}

/// Floor every edge's continuous target and accumulate the per-node
/// continuous and integer totals.
fn set_initial_integer_data(graph: &mut DemandGraph) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        graph.node_mut(id).apportion = Default::default();
    }

    let edges: Vec<_> = graph.active_edges().collect();
    for edge_id in edges {
        let (origin, destination, raw) = {
            let edge = graph.edge(edge_id);
            let origin_node = graph.node(edge.origin);
            let destination_node = graph.node(edge.destination);
            let raw = edge.baseline_count() as f64
                * origin_node.fratar.new_dep
                * destination_node.fratar.new_arr;
            (edge.origin, edge.destination, raw)
        };

        let floor = raw.floor();
        {
            let edge = graph.edge_mut(edge_id);
            edge.target_raw = raw;
            edge.remainder = raw - floor;
            edge.target_final = floor as i64;
        }

        let origin_node = graph.node_mut(origin);
        origin_node.apportion.calc_total_dep += raw;
        origin_node.apportion.calc_int_dep += floor as i64;

        let destination_node = graph.node_mut(destination);
        destination_node.apportion.calc_total_arr += raw;
        destination_node.apportion.calc_int_arr += floor as i64;
    }
}

/// Per-node scoping: each node's departure shortfall against its rounded
/// continuous total is spread over its outgoing edges. Nodes are visited
/// in descending baseline-operations order so the busiest airports place
/// their units first.
fn distribute_per_node(graph: &mut DemandGraph) {
    let mut nodes: Vec<NodeId> = graph.active_nodes().collect();
    nodes.sort_by(|&a, &b| {
        let ops_a = graph.node(a).init_total_dep + graph.node(a).init_total_arr;
        let ops_b = graph.node(b).init_total_dep + graph.node(b).init_total_arr;
        ops_b.partial_cmp(&ops_a).unwrap_or(std::cmp::Ordering::Equal)
    });

    for id in nodes {
        let node = graph.node(id);
        let target = node.apportion.calc_total_dep.round() as i64;
        let mut shortfall = target - node.apportion.calc_int_dep;
        if shortfall <= 0 {
            continue;
        }

        let edges = edges_by_remainder(graph, &graph.node(id).outgoing);
        if edges.is_empty() {
            continue;
        }
        let mut next = 0usize;
        while shortfall > 0 {
            let edge_id = edges[next % edges.len()];
            next += 1;
            let (origin, destination) = {
                let edge = graph.edge_mut(edge_id);
                edge.target_final += 1;
                (edge.origin, edge.destination)
            };
            graph.node_mut(origin).apportion.calc_int_dep += 1;
            graph.node_mut(destination).apportion.calc_int_arr += 1;
            shortfall -= 1;
        }
    }
}

/// Global scoping: one shortfall against the rounded graph-wide continuous
/// total, spread across every edge.
fn distribute_globally(graph: &mut DemandGraph) {
    let edges: Vec<_> = graph.active_edges().collect();

    let mut total_raw = 0.0;
    let mut total_int = 0i64;
    for &edge_id in &edges {
        let edge = graph.edge(edge_id);
        total_raw += edge.target_raw;
        total_int += edge.target_final;
    }

    let mut shortfall = total_raw.round() as i64 - total_int;
    if shortfall <= 0 {
        return;
    }

    let ordered = edges_by_remainder(graph, &edges);
    if ordered.is_empty() {
        return;
    }
    let mut next = 0usize;
    while shortfall > 0 {
        let edge_id = ordered[next % ordered.len()];
        next += 1;
        let (origin, destination) = {
            let edge = graph.edge_mut(edge_id);
            edge.target_final += 1;
            (edge.origin, edge.destination)
        };
        graph.node_mut(origin).apportion.calc_int_dep += 1;
        graph.node_mut(destination).apportion.calc_int_arr += 1;
        shortfall -= 1;
    }
}

/// Edges in descending-remainder order. The sort is stable, so equal
/// remainders keep their insertion (encounter) order.
fn edges_by_remainder(graph: &DemandGraph, edges: &[EdgeId]) -> Vec<EdgeId> {
    let mut ordered: Vec<EdgeId> = edges.to_vec();
    ordered.sort_by(|&a, &b| {
        graph
            .edge(b)
            .remainder
            .partial_cmp(&graph.edge(a).remainder)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered
}
