//! Residual-demand (VFR) flight synthesis.
//!
//! After cloning, each airport may still owe operations against its
//! forecast target. The gap is filled with synthetic VFR flights whose
//! local time-of-day is drawn from a trapezoidal distribution via inverse
//! CDF sampling on a dedicated seeded stream. When historical templates
//! exist for an airport, units resample a template (aircraft type, cruise
//! speed, duration) by its fraction weight; otherwise alternating
//! single-ended departure/arrival records are produced.

use crate::core::builder::ForecastWindow;
use crate::core::graph::{AirportNode, DemandGraph, NodeId};
use crate::domain::model::{FlightCategory, ScheduleRecord, VfrTemplate};
use crate::utils::error::{ForecastError, Result};
use crate::utils::validation::validate_breakpoints;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the per-airport residual gap is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualMode {
    /// Count generated flights whose off/on times fall inside the window
    /// and compare against the projected total. Flight-level counting is
    /// required because earlier stages may have shifted flights outside
    /// the window, which aggregate counts cannot see.
    #[default]
    Windowed,
    /// Derive the gap from the integerized totals and baseline counts.
    Aggregate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfrConfig {
    /// Trapezoid breakpoints in local hours: rise from `x1` to `x2`, flat
    /// to `x3`, fall to `x4`.
    pub trapezoid: [f64; 4],
    pub nominal_taxi_minutes: f64,
    pub mode: ResidualMode,
}

impl Default for VfrConfig {
    fn default() -> Self {
        Self {
            trapezoid: [5.5, 10.0, 16.0, 22.5],
            nominal_taxi_minutes: 10.0,
            mode: ResidualMode::Windowed,
        }
    }
}

/// Trapezoidal time-of-day distribution with closed-form inverse CDF.
#[derive(Debug, Clone, Copy)]
pub struct TrapezoidalDistribution {
    x1: f64,
    x2: f64,
    x4: f64,
    d21: f64,
    d32: f64,
    d43: f64,
    denom: f64,
    cutoff1: f64,
    area2: f64,
}

impl TrapezoidalDistribution {
    pub fn new(breakpoints: [f64; 4]) -> Result<Self> {
        validate_breakpoints("vfr.trapezoid", &breakpoints)?;
        let [x1, x2, x3, x4] = breakpoints;
        let d21 = x2 - x1;
        let d32 = x3 - x2;
        let d43 = x4 - x3;
        let denom = x4 + x3 - x2 - x1;
        Ok(Self {
            x1,
            x2,
            x4,
            d21,
            d32,
            d43,
            denom,
            cutoff1: d21 / denom,
            area2: 2.0 * d32 / denom,
        })
    }

    /// Invert the trapezoid CDF at `u` in `[0, 1)`.
    ///
    /// The density rises linearly on `[x1, x2]`, is flat on `[x2, x3]`
    /// and falls linearly on `[x3, x4]`, all with height `2 / denom`.
    /// Inverting each CDF branch gives a square root on the two ramps and
    /// a linear map on the plateau.
    pub fn invert_cdf(&self, u: f64) -> f64 {
        if u <= 0.0 {
            return self.x1;
        }
        if u >= 1.0 {
            return self.x4;
        }
        if u < self.cutoff1 {
            self.x1 + (u * self.denom * self.d21).sqrt()
        } else if u < self.cutoff1 + self.area2 {
            self.x2 + self.d32 * (u - self.cutoff1) / self.area2
        } else {
            self.x4 - ((1.0 - u) * self.denom * self.d43).sqrt()
        }
    }

    pub fn sample_local_hour<R: Rng>(&self, rng: &mut R) -> f64 {
        self.invert_cdf(rng.gen::<f64>())
    }
}

/// Tally, per active node, the generated flights whose off/on times fall
/// inside the window. Airports are resolved through either code.
pub fn count_windowed_flights(
    graph: &mut DemandGraph,
    records: &[ScheduleRecord],
    window: &ForecastWindow,
) {
    let ids: Vec<_> = graph.active_nodes().collect();
    for id in ids {
        graph.node_mut(id).reset_windowed_counters();
    }

    for record in records {
        if let Some(off) = record.runway_off_time {
            if window.contains(off) {
                if let Some(id) = resolve_node(graph, &record.origin, &record.origin_intl) {
                    if !graph.node(id).removed {
                        graph.node_mut(id).windowed_deps += 1;
                    }
                }
            }
        }

        if let Some(on) = record.runway_on_time {
            if window.contains(on) {
                if let Some(id) = resolve_node(graph, &record.destination, &record.destination_intl)
                {
                    if !graph.node(id).removed {
                        graph.node_mut(id).windowed_arrs += 1;
                    }
                }
            }
        }
    }
}

fn resolve_node(
    graph: &DemandGraph,
    primary: &Option<String>,
    fallback: &Option<String>,
) -> Option<NodeId> {
    primary
        .as_deref()
        .and_then(|code| graph.node_by_code(code))
        .or_else(|| fallback.as_deref().and_then(|code| graph.node_by_code(code)))
}

pub struct ResidualSynthesizer {
    config: VfrConfig,
    trapezoid: TrapezoidalDistribution,
    local_date: NaiveDate,
    templates: HashMap<String, Vec<VfrTemplate>>,
    helicopter_percent: HashMap<String, f64>,
    next_id: i64,
}

impl ResidualSynthesizer {
    pub fn new(
        config: VfrConfig,
        local_date: NaiveDate,
        templates: &[VfrTemplate],
        helicopter_percent: HashMap<String, f64>,
    ) -> Result<Self> {
        let trapezoid = TrapezoidalDistribution::new(config.trapezoid)?;

        let mut by_origin: HashMap<String, Vec<VfrTemplate>> = HashMap::new();
        for template in templates {
            if template.fraction <= 0.0 {
                return Err(ForecastError::ProcessingError {
                    message: format!(
                        "VFR template {}->{} has non-positive fraction {}",
                        template.origin, template.destination, template.fraction
                    ),
                });
            }
            by_origin
                .entry(template.origin.clone())
                .or_default()
                .push(template.clone());
        }

        Ok(Self {
            config,
            trapezoid,
            local_date,
            templates: by_origin,
            helicopter_percent,
            next_id: -1,
        })
    }

    /// Generate residual flights for every active node, consuming the VFR
    /// local-time stream. Synthetic records carry negative ids so they can
    /// never collide with baseline or clone ids.
    pub fn synthesize<R: Rng>(&mut self, graph: &DemandGraph, rng: &mut R) -> Vec<ScheduleRecord> {
        let mut results = Vec::new();

        for id in graph.active_nodes() {
            let node = graph.node(id);
            let gap = match self.config.mode {
                ResidualMode::Windowed => windowed_gap(node),
                ResidualMode::Aggregate => aggregate_gap(node),
            };
            let gap = self.helicopter_adjusted(node.airport.preferred_code(), gap);
            if gap == 0 {
                continue;
            }

            for i in 0..gap {
                results.push(self.create_record(node, i, rng));
            }
        }

        tracing::debug!("synthesized {} residual VFR flights", results.len());
        results
    }

    /// Reduce the VFR count by the share of operations flown by
    /// helicopters at this airport, when the map knows it.
    fn helicopter_adjusted(&self, code: &str, ops: i64) -> i64 {
        match self.helicopter_percent.get(code) {
            Some(pct) if ops > 0 => (ops as f64 * (1.0 - pct)).round() as i64,
            _ => ops,
        }
    }

    fn create_record<R: Rng>(
        &mut self,
        node: &AirportNode,
        index: i64,
        rng: &mut R,
    ) -> ScheduleRecord {
        let id = self.next_id;
        self.next_id -= 1;

        let local_hour = self.trapezoid.sample_local_hour(rng);
        let off_utc = self.to_utc(local_hour, node.airport.utc_offset_hours);
        let taxi = Duration::milliseconds((self.config.nominal_taxi_minutes * 60_000.0) as i64);

        let code = node.airport.preferred_code().to_string();
        let mut record = ScheduleRecord {
            id,
            act_date: Some(self.local_date),
            aircraft_id: Some(format!("V_{}_{}", code, index + 1)),
            flight_index: (index + 1) as i32,
            flight_plan_type: Some("VFR".to_string()),
            category: FlightCategory::GeneralAviation,
            origin: None,
            origin_intl: None,
            destination: None,
            destination_intl: None,
            gate_out_time: None,
            runway_off_time: None,
            runway_on_time: None,
            gate_in_time: None,
            scheduled_dep_time: None,
            scheduled_arr_time: None,
            aircraft_type: None,
            cruise_speed_kts: None,
            passthrough: None,
        };

        if let Some(template) = self.sample_template(&code, rng).cloned() {
            // Full point-to-point flight resampled from history.
            record.origin = node.airport.faa_code.clone();
            record.origin_intl = node.airport.icao_code.clone();
            record.destination = Some(template.destination.clone());
            record.category = template.category;
            record.aircraft_type = template.aircraft_type.clone();
            record.cruise_speed_kts = template.cruise_speed_kts;
            record.runway_off_time = Some(off_utc);
            record.gate_out_time = Some(off_utc - taxi);
            let on_utc = off_utc
                + Duration::milliseconds((template.duration_hours * 3_600_000.0).round() as i64);
            record.runway_on_time = Some(on_utc);
            record.gate_in_time = Some(on_utc + taxi);
        } else if index % 2 == 0 {
            // Even units depart from the airport.
            record.origin = node.airport.faa_code.clone();
            record.origin_intl = node.airport.icao_code.clone();
            record.runway_off_time = Some(off_utc);
            record.gate_out_time = Some(off_utc - taxi);
        } else {
            // Odd units arrive at it.
            record.destination = node.airport.faa_code.clone();
            record.destination_intl = node.airport.icao_code.clone();
            record.runway_on_time = Some(off_utc);
            record.gate_in_time = Some(off_utc + taxi);
        }

        record
    }

    /// Weighted draw over the airport's templates by cumulative fraction
    /// inversion; `None` when no history is available.
    fn sample_template<R: Rng>(&self, code: &str, rng: &mut R) -> Option<&VfrTemplate> {
        let templates = self.templates.get(code)?;

        let draw: f64 = rng.gen::<f64>() * templates.iter().map(|t| t.fraction).sum::<f64>();
        let mut cumulative = 0.0;
        for template in templates {
            cumulative += template.fraction;
            if draw < cumulative {
                return Some(template);
            }
        }
        templates.first()
    }

    fn to_utc(&self, local_hour: f64, utc_offset_hours: f64) -> DateTime<Utc> {
        let midnight = self
            .local_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time");
        let local = midnight + Duration::milliseconds((local_hour * 3_600_000.0).round() as i64);
        let utc = local - Duration::milliseconds((utc_offset_hours * 3_600_000.0).round() as i64);
        Utc.from_utc_datetime(&utc)
    }
}

/// `projected − windowed departures − windowed arrivals`, floored at 0.
fn windowed_gap(node: &AirportNode) -> i64 {
    let gap =
        node.projected_total_ops() - node.windowed_deps as f64 - node.windowed_arrs as f64;
    (gap.round() as i64).max(0)
}

/// `projected − (cloned + retained + operations lost to pruned
/// neighbors)`, floored at 0.
fn aggregate_gap(node: &AirportNode) -> i64 {
    let retained = node.init_total_dep + node.init_total_arr;
    let cloned = (node.apportion.calc_int_dep + node.apportion.calc_int_arr) as f64 - retained;
    let gap = node.projected_total_ops() - cloned - retained - node.removed_ops;
    (gap.round() as i64).max(0)
}
