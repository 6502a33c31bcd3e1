use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User-class categories grown at independent rates by the TAF forecast.
///
/// This is deliberately a closed set: the pipeline matches the baseline
/// schedule's user-class tags against the three TAF growth columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightCategory {
    #[serde(rename = "GA")]
    GeneralAviation,
    #[serde(rename = "MIL")]
    Military,
    #[serde(rename = "OTHER")]
    Other,
}

impl FlightCategory {
    pub const ALL: [FlightCategory; 3] = [
        FlightCategory::GeneralAviation,
        FlightCategory::Military,
        FlightCategory::Other,
    ];

    /// Classify from a raw user-class tag. The first character decides:
    /// 'G' is general aviation, 'M' is military, anything else is "other".
    pub fn from_user_class(tag: &str) -> Self {
        match tag.chars().next() {
            Some('G') => FlightCategory::GeneralAviation,
            Some('M') => FlightCategory::Military,
            _ => FlightCategory::Other,
        }
    }
}

/// Per-category operation counts. Components are fractional because TAF
/// growth scaling and Fratar balancing both work on continuous values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub ga: f64,
    pub mil: f64,
    pub other: f64,
}

impl CategoryCounts {
    pub fn new(ga: f64, mil: f64, other: f64) -> Self {
        Self { ga, mil, other }
    }

    /// A uniform vector, used when a single regional total stands in for
    /// every category at international airports.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn get(&self, category: FlightCategory) -> f64 {
        match category {
            FlightCategory::GeneralAviation => self.ga,
            FlightCategory::Military => self.mil,
            FlightCategory::Other => self.other,
        }
    }

    pub fn count_flight(&mut self, category: FlightCategory) {
        match category {
            FlightCategory::GeneralAviation => self.ga += 1.0,
            FlightCategory::Military => self.mil += 1.0,
            FlightCategory::Other => self.other += 1.0,
        }
    }

    pub fn add(&mut self, other: &CategoryCounts) {
        self.ga += other.ga;
        self.mil += other.mil;
        self.other += other.other;
    }

    pub fn subtract(&mut self, other: &CategoryCounts) {
        self.ga -= other.ga;
        self.mil -= other.mil;
        self.other -= other.other;
    }

    pub fn total(&self) -> f64 {
        self.ga + self.mil + self.other
    }
}

/// Static airport attributes from the merged airport table.
///
/// `faa_code` is the domestic identifier and `icao_code` the international
/// one; either may be absent, but not both for a usable airport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Airport {
    pub faa_code: Option<String>,
    pub icao_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_ft: i32,
    pub country_code: i32,
    /// Hours to add to local time to reach UTC is `-utc_offset_hours`.
    pub utc_offset_hours: f64,
}

impl Airport {
    /// The identity code used for graph keys: domestic first, falling back
    /// to the international code.
    pub fn preferred_code(&self) -> &str {
        self.faa_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.icao_code.as_deref())
            .unwrap_or("")
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.faa_code
            .iter()
            .chain(self.icao_code.iter())
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// One baseline (or generated) flight. Field layout mirrors the schedule
/// file: identity, category, endpoints with primary/fallback codes, the
/// four movement timestamps plus the scheduled pair, and a passthrough
/// tail preserved verbatim on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: i64,
    pub act_date: Option<NaiveDate>,
    pub aircraft_id: Option<String>,
    pub flight_index: i32,
    pub flight_plan_type: Option<String>,
    pub category: FlightCategory,
    pub origin: Option<String>,
    pub origin_intl: Option<String>,
    pub destination: Option<String>,
    pub destination_intl: Option<String>,
    pub gate_out_time: Option<DateTime<Utc>>,
    pub runway_off_time: Option<DateTime<Utc>>,
    pub runway_on_time: Option<DateTime<Utc>>,
    pub gate_in_time: Option<DateTime<Utc>>,
    pub scheduled_dep_time: Option<DateTime<Utc>>,
    pub scheduled_arr_time: Option<DateTime<Utc>>,
    pub aircraft_type: Option<String>,
    pub cruise_speed_kts: Option<f64>,
    pub passthrough: Option<String>,
}

impl ScheduleRecord {
    /// Shift every timestamp of the record by the same signed offset.
    pub fn shift_times(&mut self, offset: chrono::Duration) {
        for slot in [
            &mut self.gate_out_time,
            &mut self.runway_off_time,
            &mut self.runway_on_time,
            &mut self.gate_in_time,
            &mut self.scheduled_dep_time,
            &mut self.scheduled_arr_time,
        ] {
            if let Some(t) = slot {
                *t = *t + offset;
            }
        }
    }
}

/// Per-airport category counts for one year of TAF data. Lookups fall
/// back across airport codes and end at an all-zero default for airports
/// the table does not know (zero growth means pass-through downstream).
#[derive(Debug, Clone, Default)]
pub struct AirportCountsMap {
    data: HashMap<String, CategoryCounts>,
    default_counts: CategoryCounts,
}

impl AirportCountsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, counts: CategoryCounts) {
        self.data.insert(code.to_string(), counts);
    }

    pub fn get(&self, code: &str) -> Option<CategoryCounts> {
        self.data.get(code).copied()
    }

    /// Look up by any of the airport's codes, falling back to the default
    /// (all-zero) counts when the airport is unknown.
    pub fn counts_for(&self, airport: &Airport) -> CategoryCounts {
        for code in airport.codes() {
            if let Some(counts) = self.data.get(code) {
                return *counts;
            }
        }
        self.default_counts
    }
}

/// TAF operation counts keyed by fiscal year.
#[derive(Debug, Clone, Default)]
pub struct TafData {
    by_year: HashMap<i32, AirportCountsMap>,
}

impl TafData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, year: i32, code: &str, counts: CategoryCounts) {
        self.by_year.entry(year).or_default().insert(code, counts);
    }

    pub fn year_data(&self, year: i32) -> Option<&AirportCountsMap> {
        self.by_year.get(&year)
    }
}

/// World regions of the international APO forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Atlantic,
    Pacific,
    LatinAmerica,
    Canada,
}

/// Regional operation totals for one fiscal year. International airports
/// take their growth signal from the region they fall in rather than from
/// a per-airport TAF row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InternationalGrowth {
    pub year: i32,
    pub atlantic: Option<f64>,
    pub pacific: Option<f64>,
    pub latin_america: Option<f64>,
    pub canada: Option<f64>,
}

impl InternationalGrowth {
    pub fn region_count(&self, region: Region) -> Option<f64> {
        match region {
            Region::Atlantic => self.atlantic,
            Region::Pacific => self.pacific,
            Region::LatinAmerica => self.latin_america,
            Region::Canada => self.canada,
        }
    }
}

/// Country-code to region classification table.
#[derive(Debug, Clone, Default)]
pub struct CountryRegionTable {
    by_country_code: HashMap<i32, Region>,
}

impl CountryRegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, country_code: i32, region: Region) {
        self.by_country_code.insert(country_code, region);
    }

    pub fn region_of(&self, country_code: i32) -> Option<Region> {
        self.by_country_code.get(&country_code).copied()
    }
}

/// A historical VFR flight template, keyed by category and city pair.
/// When an airport has templates, synthesized residual flights resample
/// one by its `fraction` weight instead of using the generic
/// single-ended default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfrTemplate {
    pub category: FlightCategory,
    pub origin: String,
    pub destination: String,
    pub fraction: f64,
    pub aircraft_type: Option<String>,
    pub cruise_speed_kts: Option<f64>,
    pub duration_hours: f64,
}

/// Everything the transform stage consumes, assembled by extract.
#[derive(Debug, Clone, Default)]
pub struct ForecastInputs {
    pub schedule: Vec<ScheduleRecord>,
    pub airports: HashMap<String, Airport>,
    pub taf: TafData,
    pub international: Vec<InternationalGrowth>,
    pub regions: CountryRegionTable,
    pub vfr_templates: Vec<VfrTemplate>,
    pub helicopter_percent: HashMap<String, f64>,
}

/// What the transform stage produces: the merged schedule plus the run
/// bookkeeping downstream reporting wants.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub schedule: Vec<ScheduleRecord>,
    pub cloned_flight_count: usize,
    pub removed_flight_count: usize,
    pub synthesized_flight_count: usize,
    pub pruned_airport_count: usize,
    pub fratar_steps: u32,
    pub fratar_converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_user_class() {
        assert_eq!(
            FlightCategory::from_user_class("G"),
            FlightCategory::GeneralAviation
        );
        assert_eq!(
            FlightCategory::from_user_class("MIL"),
            FlightCategory::Military
        );
        assert_eq!(FlightCategory::from_user_class("C"), FlightCategory::Other);
        assert_eq!(FlightCategory::from_user_class(""), FlightCategory::Other);
    }

    #[test]
    fn test_category_counts_arithmetic() {
        let mut counts = CategoryCounts::new(1.0, 2.0, 3.0);
        counts.add(&CategoryCounts::new(0.5, 0.5, 0.5));
        assert_eq!(counts.total(), 7.5);

        counts.count_flight(FlightCategory::Military);
        assert_eq!(counts.mil, 2.5 + 1.0);

        counts.subtract(&CategoryCounts::new(1.5, 3.5, 3.5));
        assert_eq!(counts.total(), 0.0);
    }

    #[test]
    fn test_airport_preferred_code_falls_back_to_icao() {
        let mut airport = Airport {
            faa_code: Some("BOS".into()),
            icao_code: Some("KBOS".into()),
            ..Airport::default()
        };
        assert_eq!(airport.preferred_code(), "BOS");

        airport.faa_code = None;
        assert_eq!(airport.preferred_code(), "KBOS");
    }

    #[test]
    fn test_counts_map_fallback_lookup() {
        let mut map = AirportCountsMap::new();
        map.insert("KJFK", CategoryCounts::new(10.0, 0.0, 90.0));

        let airport = Airport {
            faa_code: Some("JFK".into()),
            icao_code: Some("KJFK".into()),
            ..Airport::default()
        };
        assert_eq!(map.counts_for(&airport).total(), 100.0);

        let unknown = Airport {
            faa_code: Some("XXX".into()),
            ..Airport::default()
        };
        assert_eq!(map.counts_for(&unknown).total(), 0.0);
    }

    #[test]
    fn test_international_growth_region_count() {
        let growth = InternationalGrowth {
            year: 2035,
            atlantic: Some(1200.0),
            pacific: None,
            latin_america: Some(300.0),
            canada: Some(800.0),
        };
        assert_eq!(growth.region_count(Region::Atlantic), Some(1200.0));
        assert_eq!(growth.region_count(Region::Pacific), None);
    }

    #[test]
    fn test_shift_times_moves_every_timestamp() {
        let base = Utc::now();
        let mut rec = ScheduleRecord {
            id: 1,
            act_date: None,
            aircraft_id: None,
            flight_index: 0,
            flight_plan_type: None,
            category: FlightCategory::Other,
            origin: Some("AAA".into()),
            origin_intl: None,
            destination: Some("BBB".into()),
            destination_intl: None,
            gate_out_time: Some(base),
            runway_off_time: Some(base),
            runway_on_time: Some(base + chrono::Duration::hours(2)),
            gate_in_time: None,
            scheduled_dep_time: None,
            scheduled_arr_time: None,
            aircraft_type: None,
            cruise_speed_kts: None,
            passthrough: None,
        };

        rec.shift_times(chrono::Duration::minutes(30));
        assert_eq!(rec.runway_off_time.unwrap(), base + chrono::Duration::minutes(30));
        assert_eq!(
            rec.runway_on_time.unwrap(),
            base + chrono::Duration::minutes(150)
        );
        assert!(rec.gate_in_time.is_none());
    }
}
