use crate::analysis::prepare;
use crate::processing::error::ProcessingError;
use crate::processing::extract::merged_records;
use crate::types::records::{columns, MergedRecord};
use chrono::Duration;
use log::{info, warn};
use polars::prelude::*;
use std::collections::HashMap;

/// Day-over-day percent change, `None` when yesterday's demand was zero.
pub fn pct_change(today: f64, yesterday: f64) -> Option<f64> {
    if yesterday == 0.0 {
        return None;
    }
    Some((today - yesterday) / yesterday * 100.0)
}

/// Latest-day snapshot per city with the change from the previous day.
///
/// The latest day is the newest date across all cities. Cities with no row on
/// that day, or none on the day before, are left out. Columns are
/// `city, date, tmax_f, tmin_f, energy_mwh, energy_pct_change`.
pub fn geographic_overview(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    let records = merged_records(&prepare(df)?)?;
    let rows = overview_rows(&records);

    let frame = df!(
        columns::CITY => rows.iter().map(|(r, _)| r.city.as_str()).collect::<Vec<_>>(),
        columns::DATE => rows.iter().map(|(r, _)| r.date).collect::<Vec<_>>(),
        columns::TMAX_F => rows.iter().map(|(r, _)| r.tmax_f).collect::<Vec<_>>(),
        columns::TMIN_F => rows.iter().map(|(r, _)| r.tmin_f).collect::<Vec<_>>(),
        columns::ENERGY_MWH => rows.iter().map(|(r, _)| r.energy_mwh).collect::<Vec<_>>(),
        "energy_pct_change" => rows.iter().map(|(_, pct)| *pct).collect::<Vec<_>>(),
    )?;

    info!("Geographic overview computed for {} cities", frame.height());
    Ok(frame)
}

fn overview_rows(records: &[MergedRecord]) -> Vec<(&MergedRecord, Option<f64>)> {
    let Some(latest) = records.iter().map(|r| r.date).max() else {
        return Vec::new();
    };
    let previous = latest - Duration::days(1);

    let mut yesterday: HashMap<&str, f64> = HashMap::new();
    for r in records.iter().filter(|r| r.date == previous) {
        yesterday.entry(r.city.as_str()).or_insert(r.energy_mwh);
    }

    let mut rows: Vec<(&MergedRecord, Option<f64>)> = records
        .iter()
        .filter(|r| r.date == latest)
        .filter_map(|r| {
            let Some(prev) = yesterday.get(r.city.as_str()) else {
                warn!("{}: no data for {}, left out of overview", r.city, previous);
                return None;
            };
            let pct = pct_change(r.energy_mwh, *prev);
            if pct.is_none() {
                warn!(
                    "{}: zero demand on {}, percent change undefined",
                    r.city, previous
                );
            }
            Some((r, pct))
        })
        .collect();
    rows.sort_by(|a, b| a.0.city.cmp(&b.0.city));
    rows
}
