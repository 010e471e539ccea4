//! Joins the weather and energy tables on (city, date).

use crate::processing::error::ProcessingError;
use crate::processing::extract::{has_column, require_columns, standardize_dates};
use crate::types::records::columns;
use log::{info, warn};
use polars::prelude::*;

/// Output of [`merge_frames`].
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The raw inner join, nulls included. This is what the quality report inspects.
    pub joined: DataFrame,
    /// `joined` without rows missing a temperature or the demand value.
    pub merged: DataFrame,
}

fn prepare_weather(weather: DataFrame) -> Result<LazyFrame, ProcessingError> {
    require_columns(
        &weather,
        "weather",
        &[columns::CITY, columns::DATE, columns::TMAX_F, columns::TMIN_F],
    )?;
    let weather = standardize_dates(weather, "weather")?;

    let mut selection = vec![col(columns::CITY).cast(DataType::String), col(columns::DATE)];
    // Older raw files only carried Fahrenheit.
    for celsius in [columns::TMAX_C, columns::TMIN_C] {
        if has_column(&weather, celsius) {
            selection.push(col(celsius).cast(DataType::Float64));
        }
    }
    selection.push(col(columns::TMAX_F).cast(DataType::Float64));
    selection.push(col(columns::TMIN_F).cast(DataType::Float64));

    Ok(weather.lazy().select(selection))
}

fn prepare_energy(mut energy: DataFrame) -> Result<LazyFrame, ProcessingError> {
    if !has_column(&energy, columns::ENERGY_MWH) && has_column(&energy, columns::LEGACY_DEMAND) {
        warn!(
            "Energy table uses legacy '{}' column; renaming to '{}'",
            columns::LEGACY_DEMAND,
            columns::ENERGY_MWH
        );
        energy.rename(columns::LEGACY_DEMAND, columns::ENERGY_MWH.into())?;
    }
    require_columns(
        &energy,
        "energy",
        &[columns::CITY, columns::DATE, columns::ENERGY_MWH],
    )?;
    let energy = standardize_dates(energy, "energy")?;

    Ok(energy.lazy().select([
        col(columns::CITY).cast(DataType::String),
        col(columns::DATE),
        col(columns::ENERGY_MWH).cast(DataType::Float64),
    ]))
}

/// Inner-joins weather and energy rows on (city, date), sorted by city then date.
///
/// Dates missing from either side are dropped without a trace; there is no
/// gap filling.
pub fn merge_frames(weather: DataFrame, energy: DataFrame) -> Result<MergeOutput, ProcessingError> {
    let weather = prepare_weather(weather)?;
    let energy = prepare_energy(energy)?;

    let joined = weather
        .join(
            energy,
            [col(columns::CITY), col(columns::DATE)],
            [col(columns::CITY), col(columns::DATE)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort_by_exprs(
            [col(columns::CITY), col(columns::DATE)],
            SortMultipleOptions::default(),
        )
        .collect()?;
    info!("Joined weather and energy: {} rows", joined.height());

    let merged = joined
        .clone()
        .lazy()
        .filter(
            col(columns::TMAX_F)
                .is_not_null()
                .and(col(columns::TMIN_F).is_not_null())
                .and(col(columns::ENERGY_MWH).is_not_null()),
        )
        .collect()?;
    info!("After dropping incomplete rows: {} rows", merged.height());

    Ok(MergeOutput { joined, merged })
}
