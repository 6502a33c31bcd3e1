//! Flight cloning.
//!
//! Realizes each edge's integerized target by duplicating its baseline
//! flights. City pairs whose target exceeds the baseline get clones with
//! Gaussian-perturbed times; pairs whose target fell below the baseline
//! have surplus flights marked for removal, which the merger filters out.
//!
//! Two independent streams are consumed: one selects which base flights
//! to duplicate or remove, the other draws the per-clone time shift.
//! Selection uses a full-scan distribution: every base flight gets
//! `n / m` copies, and the `n % m` leftover units are spread with one
//! uniform draw per candidate slot.

use crate::core::graph::DemandGraph;
use crate::domain::model::ScheduleRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClonerConfig {
    pub time_shift_std_dev_minutes: f64,
    pub max_clones_per_pair: i64,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            time_shift_std_dev_minutes: 15.0,
            max_clones_per_pair: 99,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloneOutcome {
    pub cloned: Vec<ScheduleRecord>,
    pub removed_ids: HashSet<i64>,
}

impl CloneOutcome {
    pub fn cloned_count(&self) -> usize {
        self.cloned.len()
    }

    pub fn has_removed(&self, record: &ScheduleRecord) -> bool {
        self.removed_ids.contains(&record.id)
    }
}

pub fn clone_flights<R1, R2>(
    graph: &DemandGraph,
    config: &ClonerConfig,
    first_clone_id: i64,
    selection_rng: &mut R1,
    shift_rng: &mut R2,
) -> CloneOutcome
where
    R1: Rng,
    R2: Rng,
{
    let mut outcome = CloneOutcome::default();
    let mut next_id = first_clone_id;

    for edge_id in graph.active_edges() {
        let edge = graph.edge(edge_id);
        let n_base = edge.baseline_count() as i64;
        let n_target = edge.target_final;
        if n_base == 0 {
            continue;
        }

        if n_base < n_target {
            let total_clones = (n_target - n_base).min(config.max_clones_per_pair);
            let per_flight = choose_indices(total_clones, n_base, selection_rng);

            for (i, &n_clones) in per_flight.iter().enumerate() {
                if n_clones == 0 {
                    continue;
                }
                let parent = graph.flight(edge.flights[i]);
                for _ in 0..n_clones {
                    outcome
                        .cloned
                        .push(make_clone(parent, next_id, config, shift_rng));
                    next_id += 1;
                }
            }
        }

        if n_target < n_base {
            let total_to_remove = n_base - n_target;
            let per_flight = choose_indices(total_to_remove, n_base, selection_rng);

            for (i, &n_removed) in per_flight.iter().enumerate() {
                if n_removed > 0 {
                    outcome.removed_ids.insert(graph.flight(edge.flights[i]).id);
                }
            }
        }
    }

    tracing::debug!(
        "cloned {} flights, removed {}",
        outcome.cloned.len(),
        outcome.removed_ids.len()
    );
    outcome
}

fn make_clone<R: Rng>(
    parent: &ScheduleRecord,
    id: i64,
    config: &ClonerConfig,
    shift_rng: &mut R,
) -> ScheduleRecord {
    let shift_minutes = crate::utils::random::normal_draw(
        shift_rng,
        0.0,
        config.time_shift_std_dev_minutes,
    );

    let mut clone = parent.clone();
    clone.id = id;
    clone.flight_plan_type = Some(format!("CLONE_{}", parent.id));
    clone.shift_times(chrono::Duration::milliseconds(
        (shift_minutes * 60_000.0).round() as i64,
    ));
    clone
}

/// Choose `n` from `m` with repetition permitted. Every slot receives the
/// `n / m` base share, then the `n % m` remainder is distributed without
/// replacement by a single forward scan: slot `i` wins a unit with
/// probability `left / remaining_slots`.
fn choose_indices<R: Rng>(n: i64, m: i64, rng: &mut R) -> Vec<i64> {
    let mut result = vec![n / m; m as usize];

    let mut left = n % m;
    for i in 0..m {
        if left == 0 {
            break;
        }
        let remaining = m - i;
        if remaining <= left || (remaining as f64) * rng.gen::<f64>() < left as f64 {
            result[i as usize] += 1;
            left -= 1;
        }
    }

    result
}
