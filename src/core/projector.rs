//! Growth-data merge and per-airport demand projection.
//!
//! Base-year and forecast-year TAF counts are merged into the nodes first
//! (with regional totals standing in at international airports), then each
//! node's projected departures and arrivals are derived category by
//! category. The projection scales the dep/arr *average* by the TAF growth
//! ratio while preserving the historical dep/arr imbalance.

use crate::core::graph::DemandGraph;
use crate::domain::model::{
    AirportCountsMap, CategoryCounts, FlightCategory, InternationalGrowth,
};
use crate::domain::ports::RegionLookup;

/// Which growth slot a merge writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthSlot {
    TafBase,
    TafForecast,
}

/// Clear forecast-side state on every active node so a graph can be
/// re-projected (Monte-Carlo trials reuse the built graph).
pub fn reset_projections(graph: &mut DemandGraph) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        graph.node_mut(id).reset_projections();
    }
}

/// Copy per-airport category counts from the TAF table into every active
/// node. Airports missing from the table fall back to all-zero counts,
/// which the projection treats as "no growth".
pub fn merge_taf_counts(graph: &mut DemandGraph, counts: &AirportCountsMap, slot: GrowthSlot) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        let node = graph.node_mut(id);
        let merged = counts.counts_for(&node.airport);
        match slot {
            GrowthSlot::TafBase => node.taf_base = merged,
            GrowthSlot::TafForecast => node.taf_forecast = merged,
        }
    }
}

/// Override the growth slot with the regional total at airports whose
/// country maps to an international forecast region. The single regional
/// figure is applied uniformly across categories.
pub fn merge_international_counts<R: RegionLookup>(
    graph: &mut DemandGraph,
    growth: &InternationalGrowth,
    regions: &R,
    slot: GrowthSlot,
) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        let node = graph.node_mut(id);
        let region = match regions.region_of(node.airport.country_code) {
            Some(region) => region,
            None => continue,
        };
        let count = match growth.region_count(region) {
            Some(count) => count,
            None => continue,
        };
        let counts = CategoryCounts::uniform(count);
        match slot {
            GrowthSlot::TafBase => node.taf_base = counts,
            GrowthSlot::TafForecast => node.taf_forecast = counts,
        }
    }
}

/// Derive each node's projected departure and arrival totals from its
/// baseline counts and the merged growth data.
pub fn generate_projections(graph: &mut DemandGraph) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        let node = graph.node_mut(id);

        node.init_total_dep = node.etms_dep.total();
        node.init_total_arr = node.etms_arr.total();

        let mut projected_dep = 0.0;
        let mut projected_arr = 0.0;
        for category in FlightCategory::ALL {
            let (dep, arr) = project_category(
                node.etms_dep.get(category),
                node.etms_arr.get(category),
                node.taf_base.get(category),
                node.taf_forecast.get(category),
            );
            projected_dep += dep;
            projected_arr += arr;
        }

        node.projected_dep = projected_dep;
        node.projected_arr = projected_arr;
    }
}

/// Scale one category. With positive base and forecast counts the dep/arr
/// average grows by `forecast/base` while the half-difference is carried
/// over unchanged; otherwise the baseline passes through.
fn project_category(dep: f64, arr: f64, taf_base: f64, taf_forecast: f64) -> (f64, f64) {
    if taf_base > 0.0 && taf_forecast > 0.0 {
        let avg = (dep + arr) / 2.0 * (taf_forecast / taf_base);
        let diff = (dep - arr) / 2.0;
        (avg + diff, avg - diff)
    } else {
        (dep, arr)
    }
}
