//! CSV codecs for the forecast input and output files.
//!
//! Every reader takes raw bytes (the `Storage` port hands those back) and
//! returns domain types; the schedule writer produces the bytes to hand
//! to `Storage`. Row layouts follow the documented file formats, with
//! timestamps as RFC 3339 strings.

use crate::domain::model::{
    Airport, CategoryCounts, CountryRegionTable, InternationalGrowth, Region, ScheduleRecord,
    TafData, VfrTemplate,
};
use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub fn read_schedule(data: &[u8]) -> Result<Vec<ScheduleRecord>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ScheduleRecord = row?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_schedule(records: &[ScheduleRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| ForecastError::ProcessingError {
            message: format!("failed to flush schedule CSV: {}", e),
        })
}

#[derive(Debug, Serialize, Deserialize)]
struct TafRow {
    year: i32,
    airport: String,
    ga: f64,
    mil: f64,
    other: f64,
}

pub fn read_taf(data: &[u8]) -> Result<TafData> {
    let mut reader = csv::Reader::from_reader(data);
    let mut taf = TafData::new();
    for row in reader.deserialize() {
        let row: TafRow = row?;
        taf.add(
            row.year,
            &row.airport,
            CategoryCounts::new(row.ga, row.mil, row.other),
        );
    }
    Ok(taf)
}

/// The merged airport table. Every code maps to the same record so that
/// flights can resolve through either the domestic or international code.
pub fn read_airports(data: &[u8]) -> Result<HashMap<String, Airport>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut map = HashMap::new();
    for row in reader.deserialize() {
        let airport: Airport = row?;
        for code in airport.codes() {
            map.insert(code.to_string(), airport.clone());
        }
    }
    Ok(map)
}

#[derive(Debug, Serialize, Deserialize)]
struct CountryRegionRow {
    country_code: i32,
    country: String,
    region: Region,
}

pub fn read_country_regions(data: &[u8]) -> Result<CountryRegionTable> {
    let mut reader = csv::Reader::from_reader(data);
    let mut table = CountryRegionTable::new();
    for row in reader.deserialize() {
        let row: CountryRegionRow = row?;
        table.insert(row.country_code, row.region);
    }
    Ok(table)
}

pub fn read_international(data: &[u8]) -> Result<Vec<InternationalGrowth>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let growth: InternationalGrowth = row?;
        rows.push(growth);
    }
    Ok(rows)
}

pub fn read_vfr_templates(data: &[u8]) -> Result<Vec<VfrTemplate>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut templates = Vec::new();
    for row in reader.deserialize() {
        let template: VfrTemplate = row?;
        templates.push(template);
    }
    Ok(templates)
}

#[derive(Debug, Serialize, Deserialize)]
struct HelicopterRow {
    airport: String,
    percent_helicopter: f64,
}

pub fn read_helicopter_percent(data: &[u8]) -> Result<HashMap<String, f64>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut map = HashMap::new();
    for row in reader.deserialize() {
        let row: HelicopterRow = row?;
        map.insert(row.airport, row.percent_helicopter);
    }
    Ok(map)
}
