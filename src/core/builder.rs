//! Builds the demand graph from the baseline schedule.
//!
//! Each flight runs a gauntlet of window checks before it is assigned:
//! missing or inverted times, lying entirely outside the forecast window,
//! or straddling both window edges all disqualify it. Flights that
//! straddle a single edge are either rejected or shifted into the window
//! by whole days, depending on the configured boundary policy.

use crate::core::graph::DemandGraph;
use crate::domain::model::{Airport, ScheduleRecord};
use crate::domain::ports::AirportDirectory;
use crate::utils::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForecastWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// What to do with a flight that straddles one edge of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Keep the flight as-is; only the window checks themselves apply.
    #[default]
    Reject,
    /// Shift the whole flight by whole days so that it falls inside the
    /// window, preserving its time of day.
    ShiftWholeDays,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub assigned: usize,
    pub rejected: usize,
    pub shifted: usize,
    pub unresolved_airport: usize,
}

pub struct GraphBuilder<'a, D: AirportDirectory> {
    directory: &'a D,
    window: ForecastWindow,
    policy: BoundaryPolicy,
}

impl<'a, D: AirportDirectory> GraphBuilder<'a, D> {
    pub fn new(directory: &'a D, window: ForecastWindow, policy: BoundaryPolicy) -> Self {
        Self {
            directory,
            window,
            policy,
        }
    }

    /// Assign every usable flight to the graph. Errors with
    /// `EmptyBaseline` when nothing survives, since no meaningful forecast
    /// can be produced from an empty graph.
    pub fn build(&self, records: Vec<ScheduleRecord>) -> Result<(DemandGraph, BuildStats)> {
        let mut graph = DemandGraph::new();
        let mut stats = BuildStats::default();

        if self.window.end <= self.window.start {
            tracing::debug!(
                "window end {} does not follow start {}",
                self.window.end,
                self.window.start
            );
            return Err(ForecastError::EmptyBaseline);
        }

        for record in records {
            match self.assign_flight(&mut graph, record) {
                Assignment::Assigned { shifted } => {
                    stats.assigned += 1;
                    if shifted {
                        stats.shifted += 1;
                    }
                }
                Assignment::Rejected => stats.rejected += 1,
                Assignment::UnresolvedAirport => {
                    stats.rejected += 1;
                    stats.unresolved_airport += 1;
                }
            }
        }

        tracing::debug!(
            "loaded {} flights ({} rejected, {} shifted, {} with unknown airports)",
            stats.assigned,
            stats.rejected,
            stats.shifted,
            stats.unresolved_airport
        );

        if stats.assigned == 0 {
            return Err(ForecastError::EmptyBaseline);
        }

        graph.calculate_initial_counts();
        Ok((graph, stats))
    }

    fn assign_flight(&self, graph: &mut DemandGraph, mut record: ScheduleRecord) -> Assignment {
        let (off, on) = match (record.runway_off_time, record.runway_on_time) {
            (Some(off), Some(on)) => (off, on),
            _ => return Assignment::Rejected,
        };

        // Departure must strictly precede arrival.
        if off >= on {
            return Assignment::Rejected;
        }

        // Entirely outside the forecast window.
        if off > self.window.end || on < self.window.start {
            return Assignment::Rejected;
        }

        // Straddling both edges would exceed a day once shifted.
        if off < self.window.start && on > self.window.end {
            return Assignment::Rejected;
        }

        // A flight straddling a single window edge is kept under the
        // reject policy; the shift policy realigns it by whole days.
        let mut shifted = false;
        if off < self.window.start || on > self.window.end {
            if self.policy == BoundaryPolicy::ShiftWholeDays {
                let days = if off < self.window.start {
                    days_up(self.window.start - off)
                } else {
                    -days_up(on - self.window.end)
                };
                record.shift_times(Duration::days(days));
                shifted = true;
                let off = record.runway_off_time.expect("shift preserves presence");
                let on = record.runway_on_time.expect("shift preserves presence");
                // Still outside, or now straddling both edges: give up.
                if off > self.window.end || on < self.window.start {
                    return Assignment::Rejected;
                }
                if off < self.window.start && on > self.window.end {
                    return Assignment::Rejected;
                }
            }
        }

        let origin = match self.resolve(record.origin.as_deref(), record.origin_intl.as_deref()) {
            Some(a) => a.clone(),
            None => return Assignment::UnresolvedAirport,
        };
        let destination = match self.resolve(
            record.destination.as_deref(),
            record.destination_intl.as_deref(),
        ) {
            Some(a) => a.clone(),
            None => return Assignment::UnresolvedAirport,
        };

        graph.add_flight(&origin, &destination, record);
        Assignment::Assigned { shifted }
    }

    fn resolve(&self, primary: Option<&str>, fallback: Option<&str>) -> Option<&Airport> {
        primary
            .and_then(|code| self.directory.lookup(code))
            .or_else(|| fallback.and_then(|code| self.directory.lookup(code)))
    }
}

enum Assignment {
    Assigned { shifted: bool },
    Rejected,
    UnresolvedAirport,
}

/// Whole days needed to cover `gap`, rounding up.
fn days_up(gap: Duration) -> i64 {
    let secs = gap.num_seconds();
    (secs + 86_399) / 86_400
}
