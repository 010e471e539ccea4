use crate::analysis::prepare;
use crate::processing::error::ProcessingError;
use crate::processing::extract::merged_records;
use crate::types::calendar::{weekday_name, TemperatureBand, WEEKDAYS};
use crate::types::records::MergedRecord;
use chrono::Datelike;
use log::info;
use polars::prelude::*;

const BANDS: usize = TemperatureBand::ALL.len();

/// Mean demand for each (band, weekday) cell; empty cells are 0.0.
fn cell_means(records: &[MergedRecord]) -> [[f64; 7]; BANDS] {
    let mut sums = [[0.0; 7]; BANDS];
    let mut counts = [[0usize; 7]; BANDS];
    for r in records {
        let band = TemperatureBand::of(r.tmax_f).index();
        let day = r.date.weekday().num_days_from_monday() as usize;
        sums[band][day] += r.energy_mwh;
        counts[band][day] += 1;
    }

    let mut means = [[0.0; 7]; BANDS];
    for band in 0..BANDS {
        for day in 0..7 {
            if counts[band][day] > 0 {
                means[band][day] = sums[band][day] / counts[band][day] as f64;
            }
        }
    }
    means
}

/// Temperature band × weekday grid of mean demand.
///
/// Always six rows (coldest band first) and the columns
/// `temp_range, Monday, …, Sunday`.
pub fn heatmap_matrix(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    let records = merged_records(&prepare(df)?)?;
    let means = cell_means(&records);

    let mut table: Vec<Column> = Vec::with_capacity(1 + WEEKDAYS.len());
    table.push(Column::new(
        "temp_range".into(),
        TemperatureBand::ALL
            .iter()
            .map(|b| b.label())
            .collect::<Vec<_>>(),
    ));
    for (day, weekday) in WEEKDAYS.iter().enumerate() {
        let cells: Vec<f64> = means.iter().map(|row| row[day]).collect();
        table.push(Column::new(weekday_name(*weekday).into(), cells));
    }

    info!("Heatmap matrix created from {} rows", records.len());
    Ok(DataFrame::new(table)?)
}
