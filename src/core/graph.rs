//! Arena-based demand graph.
//!
//! Airport nodes and city-pair edges live in two flat arenas addressed by
//! `NodeId`/`EdgeId`; adjacency is kept as index lists in insertion order.
//! Flight records are owned by the graph in a single vector so that edges
//! and the output stages share them by index instead of by reference.

use crate::domain::model::{Airport, CategoryCounts, ScheduleRecord};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightId(pub usize);

/// Fratar balancing state. `old_*` holds the previous iteration's value so
/// the convergence test can compare link strengths across iterations.
#[derive(Debug, Clone, Copy)]
pub struct FratarCoefficients {
    pub old_dep: f64,
    pub new_dep: f64,
    pub old_arr: f64,
    pub new_arr: f64,
}

impl Default for FratarCoefficients {
    fn default() -> Self {
        Self {
            old_dep: 1.0,
            new_dep: 1.0,
            old_arr: 1.0,
            new_arr: 1.0,
        }
    }
}

/// Integerization accumulators: the continuous per-node totals implied by
/// the Fratar coefficients and the integer allocations handed out so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApportionState {
    pub calc_total_dep: f64,
    pub calc_total_arr: f64,
    pub calc_int_dep: i64,
    pub calc_int_arr: i64,
}

#[derive(Debug, Clone)]
pub struct AirportNode {
    pub airport: Airport,

    // Baseline counts, summed from surviving edges after pruning.
    pub etms_dep: CategoryCounts,
    pub etms_arr: CategoryCounts,

    // External growth counts.
    pub taf_base: CategoryCounts,
    pub taf_forecast: CategoryCounts,

    pub init_total_dep: f64,
    pub init_total_arr: f64,
    /// Operations on edges detached because a *neighbor* was pruned; this
    /// demand cannot be redistributed and is deducted from the VFR gap.
    pub removed_ops: f64,

    pub projected_dep: f64,
    pub projected_arr: f64,

    pub fratar: FratarCoefficients,
    pub apportion: ApportionState,

    // Flight-level counters for the windowed residual variant.
    pub windowed_deps: u32,
    pub windowed_arrs: u32,

    pub outgoing: Vec<EdgeId>,
    pub incoming: Vec<EdgeId>,

    pub removed: bool,
}

impl AirportNode {
    fn new(airport: Airport) -> Self {
        Self {
            airport,
            etms_dep: CategoryCounts::default(),
            etms_arr: CategoryCounts::default(),
            taf_base: CategoryCounts::default(),
            taf_forecast: CategoryCounts::default(),
            init_total_dep: 0.0,
            init_total_arr: 0.0,
            removed_ops: 0.0,
            projected_dep: 0.0,
            projected_arr: 0.0,
            fratar: FratarCoefficients::default(),
            apportion: ApportionState::default(),
            windowed_deps: 0,
            windowed_arrs: 0,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            removed: false,
        }
    }

    pub fn is_source(&self) -> bool {
        self.incoming.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.outgoing.is_empty()
    }

    pub fn is_source_or_sink(&self) -> bool {
        self.is_source() || self.is_sink()
    }

    /// Forecast-year target for total operations at this node.
    pub fn projected_total_ops(&self) -> f64 {
        self.projected_dep + self.projected_arr
    }

    pub fn reset_projections(&mut self) {
        self.taf_forecast = CategoryCounts::default();
        self.projected_dep = 0.0;
        self.projected_arr = 0.0;
        self.fratar = FratarCoefficients::default();
        self.apportion = ApportionState::default();
    }

    pub fn reset_windowed_counters(&mut self) {
        self.windowed_deps = 0;
        self.windowed_arrs = 0;
    }
}

#[derive(Debug, Clone)]
pub struct DemandEdge {
    pub origin: NodeId,
    pub destination: NodeId,
    pub counts: CategoryCounts,
    pub flights: Vec<FlightId>,

    /// Continuous target flow from the Fratar coefficients.
    pub target_raw: f64,
    /// Fractional part of `target_raw`, used by largest-remainder
    /// apportionment.
    pub remainder: f64,
    /// Integerized target flow.
    pub target_final: i64,
    /// `max(0, target_final - baseline)`; meaningful after integerization.
    pub clones_to_make: i64,

    /// Set when either endpoint was pruned; detached edges carry their
    /// flights through to the output unchanged.
    pub detached: bool,
}

impl DemandEdge {
    fn new(origin: NodeId, destination: NodeId) -> Self {
        Self {
            origin,
            destination,
            counts: CategoryCounts::default(),
            flights: Vec::new(),
            target_raw: 0.0,
            remainder: 0.0,
            target_final: 0,
            clones_to_make: 0,
            detached: false,
        }
    }

    pub fn baseline_count(&self) -> usize {
        self.flights.len()
    }
}

#[derive(Debug, Default)]
pub struct DemandGraph {
    nodes: Vec<AirportNode>,
    edges: Vec<DemandEdge>,
    flights: Vec<ScheduleRecord>,
    node_index: HashMap<String, NodeId>,
    edge_index: HashMap<(NodeId, NodeId), EdgeId>,
    removed_ops_total: f64,
}

impl DemandGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &AirportNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AirportNode {
        &mut self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &DemandEdge {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut DemandEdge {
        &mut self.edges[id.0]
    }

    pub fn flight(&self, id: FlightId) -> &ScheduleRecord {
        &self.flights[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn flight_count(&self) -> usize {
        self.flights.len()
    }

    pub fn flights(&self) -> &[ScheduleRecord] {
        &self.flights
    }

    pub fn removed_ops_total(&self) -> f64 {
        self.removed_ops_total
    }

    /// Nodes still participating in distribution, in insertion order.
    pub fn active_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed)
            .map(|(i, _)| NodeId(i))
    }

    /// All edges in insertion order, attached and detached alike.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn active_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.detached)
            .map(|(i, _)| EdgeId(i))
    }

    pub fn node_by_code(&self, code: &str) -> Option<NodeId> {
        self.node_index.get(code).copied()
    }

    fn intern_node(&mut self, airport: &Airport) -> NodeId {
        let key = airport.preferred_code().to_string();
        if let Some(&id) = self.node_index.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(AirportNode::new(airport.clone()));
        // Index every code so flight-level counting can resolve either form.
        for code in self.nodes[id.0].airport.codes() {
            self.node_index.entry(code.to_string()).or_insert(id);
        }
        id
    }

    fn intern_edge(&mut self, origin: NodeId, destination: NodeId) -> EdgeId {
        if let Some(&id) = self.edge_index.get(&(origin, destination)) {
            return id;
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(DemandEdge::new(origin, destination));
        self.edge_index.insert((origin, destination), id);
        self.nodes[origin.0].outgoing.push(id);
        self.nodes[destination.0].incoming.push(id);
        id
    }

    /// Get-or-create both endpoint nodes and the directed edge between
    /// them, then append the flight and bump the edge's category counts.
    pub fn add_flight(
        &mut self,
        origin: &Airport,
        destination: &Airport,
        record: ScheduleRecord,
    ) -> EdgeId {
        let origin_id = self.intern_node(origin);
        let destination_id = self.intern_node(destination);
        let edge_id = self.intern_edge(origin_id, destination_id);

        let flight_id = FlightId(self.flights.len());
        let category = record.category;
        self.flights.push(record);

        let edge = &mut self.edges[edge_id.0];
        edge.flights.push(flight_id);
        edge.counts.count_flight(category);
        edge_id
    }

    /// Sum per-node baseline counts from the currently attached edges.
    pub fn calculate_initial_counts(&mut self) {
        for i in 0..self.nodes.len() {
            let mut dep = CategoryCounts::default();
            let mut arr = CategoryCounts::default();
            for &edge_id in &self.nodes[i].outgoing {
                dep.add(&self.edges[edge_id.0].counts);
            }
            for &edge_id in &self.nodes[i].incoming {
                arr.add(&self.edges[edge_id.0].counts);
            }
            let node = &mut self.nodes[i];
            node.etms_dep = dep;
            node.etms_arr = arr;
        }
    }

    /// Remove a node from the working set: every edge touching it is
    /// detached from the *other* endpoint's adjacency and the detached
    /// operations are charged to that surviving neighbor. The pruned node
    /// keeps its own adjacency so its flights can still be passed through.
    pub fn detach_node(&mut self, id: NodeId) {
        let incoming = self.nodes[id.0].incoming.clone();
        for edge_id in incoming {
            let edge = &mut self.edges[edge_id.0];
            if edge.detached {
                continue;
            }
            edge.detached = true;
            let ops = edge.baseline_count() as f64;
            let neighbor = edge.origin;
            self.removed_ops_total += ops;
            if neighbor != id {
                let n = &mut self.nodes[neighbor.0];
                n.outgoing.retain(|&e| e != edge_id);
                n.removed_ops += ops;
            }
        }

        let outgoing = self.nodes[id.0].outgoing.clone();
        for edge_id in outgoing {
            let edge = &mut self.edges[edge_id.0];
            if edge.detached {
                continue;
            }
            edge.detached = true;
            let ops = edge.baseline_count() as f64;
            let neighbor = edge.destination;
            self.removed_ops_total += ops;
            if neighbor != id {
                let n = &mut self.nodes[neighbor.0];
                n.incoming.retain(|&e| e != edge_id);
                n.removed_ops += ops;
            }
        }

        self.nodes[id.0].removed = true;
    }

    /// Mirror-edge invariant: an edge id in a node's outgoing list must
    /// name that node as origin and appear in the destination's incoming
    /// list, and vice versa.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        for (i, node) in self.nodes.iter().enumerate() {
            for &edge_id in &node.outgoing {
                let edge = self.edge(edge_id);
                assert_eq!(edge.origin, NodeId(i), "outgoing edge with wrong origin");
                assert!(
                    self.node(edge.destination).incoming.contains(&edge_id)
                        || self.node(edge.destination).removed,
                    "edge missing from destination's incoming list"
                );
            }
            for &edge_id in &node.incoming {
                let edge = self.edge(edge_id);
                assert_eq!(
                    edge.destination,
                    NodeId(i),
                    "incoming edge with wrong destination"
                );
            }
        }
        for edge in &self.edges {
            assert!(edge.counts.ga >= 0.0 && edge.counts.mil >= 0.0 && edge.counts.other >= 0.0);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::model::FlightCategory;
    use chrono::{TimeZone, Utc};

    pub fn airport(code: &str) -> Airport {
        Airport {
            faa_code: Some(code.to_string()),
            icao_code: Some(format!("K{}", code)),
            utc_offset_hours: -5.0,
            ..Airport::default()
        }
    }

    pub fn flight(id: i64, origin: &str, destination: &str) -> ScheduleRecord {
        let off = Utc.with_ymd_and_hms(2030, 4, 12, 14, 0, 0).unwrap();
        ScheduleRecord {
            id,
            act_date: None,
            aircraft_id: Some(format!("N{}", id)),
            flight_index: id as i32,
            flight_plan_type: None,
            category: FlightCategory::Other,
            origin: Some(origin.to_string()),
            origin_intl: Some(format!("K{}", origin)),
            destination: Some(destination.to_string()),
            destination_intl: Some(format!("K{}", destination)),
            gate_out_time: None,
            runway_off_time: Some(off),
            runway_on_time: Some(off + chrono::Duration::hours(2)),
            gate_in_time: None,
            scheduled_dep_time: None,
            scheduled_arr_time: None,
            aircraft_type: None,
            cruise_speed_kts: None,
            passthrough: None,
        }
    }

    /// A triangle A->B, B->C, C->A with the given flight counts per edge.
    pub fn triangle(ab: usize, bc: usize, ca: usize) -> DemandGraph {
        let mut graph = DemandGraph::new();
        let mut next_id = 1;
        for (origin, destination, n) in [("AAA", "BBB", ab), ("BBB", "CCC", bc), ("CCC", "AAA", ca)]
        {
            for _ in 0..n {
                graph.add_flight(
                    &airport(origin),
                    &airport(destination),
                    flight(next_id, origin, destination),
                );
                next_id += 1;
            }
        }
        graph.calculate_initial_counts();
        graph
    }
}
