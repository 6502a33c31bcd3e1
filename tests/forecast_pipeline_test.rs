//! End-to-end tests of the forecast pipeline: conservation under zero
//! growth, the triangle growth scenario, determinism across seeded runs,
//! and the file-backed extract/transform/load path.

use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use taf_forecast::adapters::codecs;
use taf_forecast::config::ScenarioConfig;
use taf_forecast::core::pipeline::run_forecast;
use taf_forecast::domain::model::{
    Airport, CategoryCounts, FlightCategory, ForecastInputs, ScheduleRecord,
};
use taf_forecast::domain::ports::Pipeline;
use taf_forecast::{ForecastEngine, ForecastPipeline, LocalStorage};

const SCENARIO_TOML: &str = r#"
[scenario]
name = "integration"
description = "integration scenario"
version = "1.0"

[input]
schedule = "data/schedule.csv"
airports = "data/airports.csv"
taf = "data/taf.csv"

[forecast]
base_year = 2030
forecast_year = 2035

[window]
start_date = "2030-04-12"
utc_offset_hours = 9.0

[load]
output_path = "output"
"#;

fn scenario() -> ScenarioConfig {
    ScenarioConfig::from_toml_str(SCENARIO_TOML).unwrap()
}

fn baseline_flight(id: i64, origin: &str, destination: &str, hour: u32) -> ScheduleRecord {
    let off = Utc.with_ymd_and_hms(2030, 4, 12, hour, 0, 0).unwrap();
    ScheduleRecord {
        id,
        act_date: Some(chrono::NaiveDate::from_ymd_opt(2030, 4, 12).unwrap()),
        aircraft_id: Some(format!("N{}", id)),
        flight_index: id as i32,
        flight_plan_type: None,
        category: FlightCategory::Other,
        origin: Some(origin.to_string()),
        origin_intl: Some(format!("K{}", origin)),
        destination: Some(destination.to_string()),
        destination_intl: Some(format!("K{}", destination)),
        gate_out_time: Some(off - chrono::Duration::minutes(10)),
        runway_off_time: Some(off),
        runway_on_time: Some(off + chrono::Duration::hours(1)),
        gate_in_time: Some(off + chrono::Duration::minutes(70)),
        scheduled_dep_time: None,
        scheduled_arr_time: None,
        aircraft_type: Some("B738".to_string()),
        cruise_speed_kts: Some(430.0),
        passthrough: Some(format!("tail-{}", id)),
    }
}

/// Triangle A->B (4), B->C (2), C->A (2), single category, with the
/// given uniform growth ratio between 2030 and 2035.
fn triangle_inputs(growth: f64) -> ForecastInputs {
    let mut inputs = ForecastInputs::default();

    let mut id = 1;
    for (origin, destination, n) in [("AAA", "BBB", 4), ("BBB", "CCC", 2), ("CCC", "AAA", 2)] {
        for k in 0..n {
            inputs
                .schedule
                .push(baseline_flight(id, origin, destination, 10 + k));
            id += 1;
        }
    }

    for code in ["AAA", "BBB", "CCC"] {
        let airport = Airport {
            faa_code: Some(code.to_string()),
            icao_code: Some(format!("K{}", code)),
            utc_offset_hours: -5.0,
            ..Airport::default()
        };
        for c in airport.codes() {
            inputs.airports.insert(c.to_string(), airport.clone());
        }
        inputs
            .taf
            .add(2030, code, CategoryCounts::new(0.0, 0.0, 100.0));
        inputs
            .taf
            .add(2035, code, CategoryCounts::new(0.0, 0.0, 100.0 * growth));
    }

    inputs
}

#[test]
fn conservation_zero_growth_output_equals_input() {
    let inputs = triangle_inputs(1.0);
    let baseline = inputs.schedule.clone();
    let outcome = run_forecast(inputs, &scenario()).unwrap();

    assert_eq!(outcome.cloned_flight_count, 0);
    assert_eq!(outcome.removed_flight_count, 0);
    assert_eq!(outcome.synthesized_flight_count, 0);
    assert!(outcome.fratar_converged);

    let mut expected = baseline;
    let mut actual = outcome.schedule;
    expected.sort_by_key(|r| r.id);
    actual.sort_by_key(|r| r.id);
    assert_eq!(expected, actual);
}

#[test]
fn growth_scenario_triangle() {
    let outcome = run_forecast(triangle_inputs(1.5), &scenario()).unwrap();

    // Stable flows are 5.5 / 3.0 / 3.5; largest-remainder integerization
    // yields targets 6 / 3 / 4, so five clones over the 8 baseline
    // flights. Every airport's residual gap rounds to zero.
    assert_eq!(outcome.cloned_flight_count, 5);
    assert_eq!(outcome.pruned_airport_count, 0);
    assert_eq!(outcome.synthesized_flight_count, 0);
    assert_eq!(outcome.schedule.len(), 13);

    let clones: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|r| {
            r.flight_plan_type
                .as_deref()
                .is_some_and(|t| t.starts_with("CLONE_"))
        })
        .collect();
    assert_eq!(clones.len(), 5);

    // Clones inherit their parents' endpoints and passthrough fields.
    for clone in clones {
        assert!(clone.passthrough.is_some());
        assert!(clone.origin.is_some());
        assert!(clone.destination.is_some());
    }
}

#[test]
fn determinism_same_seeds_byte_identical() {
    let a = run_forecast(triangle_inputs(1.9), &scenario()).unwrap();
    let b = run_forecast(triangle_inputs(1.9), &scenario()).unwrap();

    let bytes_a = codecs::write_schedule(&a.schedule).unwrap();
    let bytes_b = codecs::write_schedule(&b.schedule).unwrap();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn determinism_different_seed_differs() {
    let a = run_forecast(triangle_inputs(1.9), &scenario()).unwrap();

    let mut config = scenario();
    config.seeds.time_shift += 1;
    let b = run_forecast(triangle_inputs(1.9), &config).unwrap();

    // Same counts, different perturbed times.
    assert_eq!(a.schedule.len(), b.schedule.len());
    let bytes_a = codecs::write_schedule(&a.schedule).unwrap();
    let bytes_b = codecs::write_schedule(&b.schedule).unwrap();
    assert_ne!(bytes_a, bytes_b);
}

#[test]
fn pruned_airports_pass_flights_through() {
    let mut inputs = triangle_inputs(1.0);
    // One flight into a sink airport that cannot be balanced.
    let mut stray = baseline_flight(50, "AAA", "DDD", 12);
    stray.origin_intl = Some("KAAA".to_string());
    inputs.schedule.push(stray.clone());
    let airport = Airport {
        faa_code: Some("DDD".to_string()),
        icao_code: Some("KDDD".to_string()),
        utc_offset_hours: -5.0,
        ..Airport::default()
    };
    for c in airport.codes() {
        inputs.airports.insert(c.to_string(), airport.clone());
    }

    let outcome = run_forecast(inputs, &scenario()).unwrap();
    assert_eq!(outcome.pruned_airport_count, 1);
    let passed = outcome.schedule.iter().find(|r| r.id == 50).unwrap();
    assert_eq!(*passed, stray);
}

#[test]
fn residual_vfr_fills_taf_surplus() {
    let mut inputs = triangle_inputs(1.0);
    // Raise only AAA's forecast so the cloned+retained schedule cannot
    // cover it and residual VFR flights appear there.
    inputs
        .taf
        .add(2035, "AAA", CategoryCounts::new(0.0, 0.0, 200.0));

    let outcome = run_forecast(inputs, &scenario()).unwrap();
    assert!(outcome.synthesized_flight_count > 0);

    let vfr: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|r| r.flight_plan_type.as_deref() == Some("VFR"))
        .collect();
    assert_eq!(vfr.len(), outcome.synthesized_flight_count);
    for flight in vfr {
        assert!(flight.id < 0);
        assert_eq!(flight.category, FlightCategory::GeneralAviation);
        let touches_aaa = flight.origin.as_deref() == Some("AAA")
            || flight.destination.as_deref() == Some("AAA");
        assert!(touches_aaa);
    }
}

#[tokio::test]
async fn file_backed_pipeline_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_str().unwrap().to_string();

    std::fs::create_dir_all(dir.path().join("data")).unwrap();

    let inputs = triangle_inputs(1.5);
    std::fs::write(
        dir.path().join("data/schedule.csv"),
        codecs::write_schedule(&inputs.schedule).unwrap(),
    )
    .unwrap();

    let mut airports_csv =
        String::from("faa_code,icao_code,latitude,longitude,elevation_ft,country_code,utc_offset_hours\n");
    for code in ["AAA", "BBB", "CCC"] {
        airports_csv.push_str(&format!("{code},K{code},42.0,-71.0,20,1,-5.0\n"));
    }
    std::fs::write(dir.path().join("data/airports.csv"), airports_csv).unwrap();

    let mut taf_csv = String::from("year,airport,ga,mil,other\n");
    for code in ["AAA", "BBB", "CCC"] {
        taf_csv.push_str(&format!("2030,{code},0,0,100\n"));
        taf_csv.push_str(&format!("2035,{code},0,0,150\n"));
    }
    std::fs::write(dir.path().join("data/taf.csv"), taf_csv).unwrap();

    let config = scenario();
    let storage = LocalStorage::new(base.clone());
    let pipeline = ForecastPipeline::new(storage, config);
    let engine = ForecastEngine::new(pipeline);

    let output_path = engine.run().await.unwrap();
    assert_eq!(output_path, "output/forecast_schedule.csv");

    let written = std::fs::read(dir.path().join("output/forecast_schedule.csv")).unwrap();
    let records = codecs::read_schedule(&written).unwrap();
    assert_eq!(records.len(), 13);

    let summary: serde_json::Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("output/forecast_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["cloned_flights"], 5);
    assert_eq!(summary["output_flights"], 13);
}

#[test]
fn extract_errors_surface_as_io() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
    let pipeline = ForecastPipeline::new(storage, scenario());

    let result = tokio_test::block_on(pipeline.extract());
    assert!(matches!(
        result,
        Err(taf_forecast::ForecastError::IoError(_))
    ));
}

#[test]
fn apportionment_bound_holds_for_awkward_ratios() {
    for ratio in [1.13, 1.37, 1.61, 2.23] {
        let outcome = run_forecast(triangle_inputs(ratio), &scenario()).unwrap();
        // Output never loses baseline flights under growth, and the clone
        // count stays within one unit of the continuous surplus per pair.
        assert!(outcome.schedule.len() >= 8, "ratio {}", ratio);
        assert_eq!(outcome.removed_flight_count, 0, "ratio {}", ratio);
    }
}

#[test]
fn shrinking_demand_removes_flights() {
    let outcome = run_forecast(triangle_inputs(0.4), &scenario()).unwrap();
    assert!(outcome.removed_flight_count > 0);
    assert_eq!(outcome.cloned_flight_count, 0);
    // Removed flights are gone from the merged output.
    assert_eq!(
        outcome.schedule.len(),
        8 - outcome.removed_flight_count + outcome.synthesized_flight_count
    );
}

#[test]
fn vfr_templates_shape_residual_flights() {
    let mut inputs = triangle_inputs(1.0);
    inputs
        .taf
        .add(2035, "AAA", CategoryCounts::new(0.0, 0.0, 200.0));
    inputs.vfr_templates.push(taf_forecast::domain::model::VfrTemplate {
        category: FlightCategory::GeneralAviation,
        origin: "AAA".to_string(),
        destination: "BBB".to_string(),
        fraction: 1.0,
        aircraft_type: Some("C172".to_string()),
        cruise_speed_kts: Some(110.0),
        duration_hours: 0.75,
    });

    let outcome = run_forecast(inputs, &scenario()).unwrap();
    let vfr: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|r| r.flight_plan_type.as_deref() == Some("VFR"))
        .collect();
    assert!(!vfr.is_empty());
    for flight in vfr {
        assert_eq!(flight.destination.as_deref(), Some("BBB"));
        assert_eq!(flight.aircraft_type.as_deref(), Some("C172"));
    }
}

#[test]
fn helicopter_share_reduces_residual() {
    let mut with_map = triangle_inputs(1.0);
    with_map
        .taf
        .add(2035, "AAA", CategoryCounts::new(0.0, 0.0, 200.0));
    let mut without_map = with_map.clone();

    let mut helicopter = HashMap::new();
    helicopter.insert("AAA".to_string(), 0.5);
    with_map.helicopter_percent = helicopter;

    let reduced = run_forecast(with_map, &scenario()).unwrap();
    let full = run_forecast(without_map.clone(), &scenario()).unwrap();
    assert!(reduced.synthesized_flight_count < full.synthesized_flight_count);

    // Fully-helicopter airports generate nothing at all.
    let mut all_helicopter = without_map;
    let mut map = HashMap::new();
    map.insert("AAA".to_string(), 1.0);
    all_helicopter.helicopter_percent = map;
    let none = run_forecast(all_helicopter, &scenario()).unwrap();
    assert_eq!(none.synthesized_flight_count, 0);
}
