//! Row types produced at the fetch boundary and their table form.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column names shared by every table the pipeline reads or writes.
pub mod columns {
    pub const CITY: &str = "city";
    pub const DATE: &str = "date";
    pub const TMAX_C: &str = "tmax_c";
    pub const TMIN_C: &str = "tmin_c";
    pub const TMAX_F: &str = "tmax_f";
    pub const TMIN_F: &str = "tmin_f";
    pub const ENERGY_MWH: &str = "energy_mwh";
    /// Name the energy column carried in older raw files.
    pub const LEGACY_DEMAND: &str = "demand";
}

/// One day of weather for one city.
///
/// `tmax_f >= tmin_f` is deliberately not enforced; inverted or extreme values
/// are left for the quality report to flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub date: NaiveDate,
    pub tmax_c: f64,
    pub tmin_c: f64,
    pub tmax_f: f64,
    pub tmin_f: f64,
}

/// One day of electricity demand for one city, in MWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub city: String,
    pub date: NaiveDate,
    pub energy_mwh: f64,
}

/// A (city, date) row present in both the weather and the energy series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub city: String,
    pub date: NaiveDate,
    pub tmax_f: f64,
    pub tmin_f: f64,
    pub energy_mwh: f64,
}

/// Builds the raw weather table: `city, date, tmax_c, tmin_c, tmax_f, tmin_f`.
pub fn weather_frame(records: &[WeatherRecord]) -> PolarsResult<DataFrame> {
    df!(
        columns::CITY => records.iter().map(|r| r.city.as_str()).collect::<Vec<_>>(),
        columns::DATE => records.iter().map(|r| r.date).collect::<Vec<_>>(),
        columns::TMAX_C => records.iter().map(|r| r.tmax_c).collect::<Vec<_>>(),
        columns::TMIN_C => records.iter().map(|r| r.tmin_c).collect::<Vec<_>>(),
        columns::TMAX_F => records.iter().map(|r| r.tmax_f).collect::<Vec<_>>(),
        columns::TMIN_F => records.iter().map(|r| r.tmin_f).collect::<Vec<_>>(),
    )
}

/// Builds the raw energy table: `city, date, energy_mwh`.
pub fn energy_frame(records: &[EnergyRecord]) -> PolarsResult<DataFrame> {
    df!(
        columns::CITY => records.iter().map(|r| r.city.as_str()).collect::<Vec<_>>(),
        columns::DATE => records.iter().map(|r| r.date).collect::<Vec<_>>(),
        columns::ENERGY_MWH => records.iter().map(|r| r.energy_mwh).collect::<Vec<_>>(),
    )
}

/// Builds a merged table from already-joined rows.
///
/// The analysis functions only need `city, date, tmax_f, tmin_f, energy_mwh`,
/// so this is the shape used by tests and benchmarks.
pub fn merged_frame(records: &[MergedRecord]) -> PolarsResult<DataFrame> {
    df!(
        columns::CITY => records.iter().map(|r| r.city.as_str()).collect::<Vec<_>>(),
        columns::DATE => records.iter().map(|r| r.date).collect::<Vec<_>>(),
        columns::TMAX_F => records.iter().map(|r| r.tmax_f).collect::<Vec<_>>(),
        columns::TMIN_F => records.iter().map(|r| r.tmin_f).collect::<Vec<_>>(),
        columns::ENERGY_MWH => records.iter().map(|r| r.energy_mwh).collect::<Vec<_>>(),
    )
}
