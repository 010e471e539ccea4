//! NOAA Climate Data Online (GHCND) daily temperatures.

use crate::clients::error::FetchError;
use crate::clients::retry_client::{ApiRequest, JsonSource};
use crate::clients::window::FetchWindow;
use crate::types::city::City;
use crate::types::data_kind::DataKind;
use crate::types::records::WeatherRecord;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const NOAA_DATA_URL: &str = "https://www.ncei.noaa.gov/cdo-web/api/v2/data";
/// NOAA caps `limit` at 1000.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct NoaaReading {
    date: String,
    datatype: String,
    value: f64,
}

/// A parsed reading: one datatype on one day, in tenths of a degree Celsius.
#[derive(Debug, Clone, PartialEq)]
struct Reading {
    date: NaiveDate,
    datatype: String,
    tenths: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tenths of a degree Celsius to degrees Celsius, rounded to 2 decimals.
pub fn celsius_from_tenths(tenths: f64) -> f64 {
    round2(tenths / 10.0)
}

/// Tenths of a degree Celsius to degrees Fahrenheit, rounded to 2 decimals.
///
/// ```
/// use gridpulse::fahrenheit_from_tenths;
///
/// assert_eq!(fahrenheit_from_tenths(0.0), 32.0);
/// assert_eq!(fahrenheit_from_tenths(1000.0), 212.0);
/// ```
pub fn fahrenheit_from_tenths(tenths: f64) -> f64 {
    round2(celsius_from_tenths(tenths) * 9.0 / 5.0 + 32.0)
}

pub struct WeatherClient<'a, S> {
    source: &'a S,
    token: &'a str,
    page_size: usize,
    max_pages: usize,
}

impl<'a, S: JsonSource> WeatherClient<'a, S> {
    pub fn new(source: &'a S, token: &'a str) -> Self {
        Self {
            source,
            token,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_paging(mut self, page_size: usize, max_pages: usize) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetches, pivots and trims one city's daily max/min temperatures.
    ///
    /// Returns an empty vector (with a warning) when the station reported
    /// nothing in the window. Fewer complete days than requested is also only
    /// a warning.
    pub async fn fetch_city(
        &self,
        city: &City,
        window: &FetchWindow,
    ) -> Result<Vec<WeatherRecord>, FetchError> {
        info!(
            "Fetching weather for {} from {} to {}",
            city, window.start, window.end
        );
        let readings = self.fetch_readings(city, window).await?;
        if readings.is_empty() {
            warn!("No weather data returned for {}", city);
            return Ok(Vec::new());
        }

        let records = pivot_daily(&city.name, readings, window.retained_days);
        if records.len() < window.retained_days {
            warn!(
                "{}: only {} complete weather days available (wanted {})",
                city,
                records.len(),
                window.retained_days
            );
        }
        if let Some(latest) = records.last().map(|r| r.date) {
            if latest < window.end {
                warn!("{}: Weather data not up-to-date (latest: {})", city, latest);
            }
        }

        info!("Weather data ready for {}: {} records", city, records.len());
        Ok(records)
    }

    async fn fetch_readings(
        &self,
        city: &City,
        window: &FetchWindow,
    ) -> Result<Vec<Reading>, FetchError> {
        let mut readings = Vec::new();
        // NOAA offsets are 1-based.
        let mut offset = 1;

        for page in 1..=self.max_pages {
            let request = ApiRequest::new(NOAA_DATA_URL)
                .header("token", self.token)
                .query("datasetid", "GHCND")
                .query("stationid", &city.station_id)
                .query("startdate", window.start)
                .query("enddate", window.end)
                .query("datatypeid", "TMAX,TMIN")
                .query("limit", self.page_size)
                .query("offset", offset);

            let body = self.source.get_json(&request).await?;
            let page_readings = parse_page(city, &body)?;
            let count = page_readings.len();
            debug!("{}: weather page {} returned {} readings", city, page, count);
            readings.extend(page_readings);

            if count < self.page_size {
                return Ok(readings);
            }
            offset += count;
        }

        warn!(
            "{}: stopped paging weather after {} pages",
            city, self.max_pages
        );
        Ok(readings)
    }
}

fn parse_noaa_date(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// NOAA answers an empty window with `{}`, so a missing `results` is an empty
/// page rather than a schema problem.
fn parse_page(city: &City, body: &Value) -> Result<Vec<Reading>, FetchError> {
    let Some(results) = body.get("results") else {
        return Ok(Vec::new());
    };
    let results = results.as_array().ok_or_else(|| {
        FetchError::schema(DataKind::Weather, &city.name, "'results' is not an array")
    })?;

    results
        .iter()
        .map(|entry| {
            let raw = NoaaReading::deserialize(entry).map_err(|e| {
                FetchError::schema(DataKind::Weather, &city.name, format!("malformed reading: {e}"))
            })?;
            let date = parse_noaa_date(&raw.date).ok_or_else(|| {
                FetchError::schema(
                    DataKind::Weather,
                    &city.name,
                    format!("unparseable date '{}'", raw.date),
                )
            })?;
            Ok(Reading {
                date,
                datatype: raw.datatype,
                tenths: raw.value,
            })
        })
        .collect()
}

/// One row per day with both TMAX and TMIN, newest `retained_days` kept,
/// ascending by date.
fn pivot_daily(city: &str, readings: Vec<Reading>, retained_days: usize) -> Vec<WeatherRecord> {
    let mut days: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for reading in readings {
        let entry = days.entry(reading.date).or_default();
        match reading.datatype.as_str() {
            "TMAX" => entry.0 = Some(reading.tenths),
            "TMIN" => entry.1 = Some(reading.tenths),
            _ => {}
        }
    }

    let complete: Vec<WeatherRecord> = days
        .into_iter()
        .filter_map(|(date, pair)| match pair {
            (Some(tmax), Some(tmin)) => Some(WeatherRecord {
                city: city.to_string(),
                date,
                tmax_c: celsius_from_tenths(tmax),
                tmin_c: celsius_from_tenths(tmin),
                tmax_f: fahrenheit_from_tenths(tmax),
                tmin_f: fahrenheit_from_tenths(tmin),
            }),
            _ => None,
        })
        .collect();

    let skip = complete.len().saturating_sub(retained_days);
    complete.into_iter().skip(skip).collect()
}
