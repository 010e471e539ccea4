//! Summary tables derived from the merged batch.
//!
//! Every function here is pure: it takes the merged table and returns a new
//! one. Input dates may be `Date` or string typed.

pub mod correlation;
pub mod day_type;
pub mod geographic;
pub mod heatmap;
pub mod seasonal;

use crate::processing::error::ProcessingError;
use crate::processing::extract::{require_columns, standardize_dates};
use crate::types::records::columns;
use log::info;
use polars::prelude::*;

pub use correlation::compute_correlation;
pub use day_type::weekday_weekend_analysis;
pub use geographic::geographic_overview;
pub use heatmap::heatmap_matrix;
pub use seasonal::seasonal_pattern_analysis;

pub const CORRELATION_FILE: &str = "correlation_matrix.csv";
pub const WEEKDAY_WEEKEND_FILE: &str = "weekday_weekend_summary.csv";
pub const SEASONAL_FILE: &str = "seasonal_pattern_summary.csv";
pub const GEOGRAPHIC_FILE: &str = "geographic_overview.csv";
pub const HEATMAP_FILE: &str = "heatmap_matrix.csv";

/// Typed, date-normalized view of the merged columns the analyses read.
pub(crate) fn prepare(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    require_columns(
        df,
        "merged",
        &[
            columns::CITY,
            columns::DATE,
            columns::TMAX_F,
            columns::TMIN_F,
            columns::ENERGY_MWH,
        ],
    )?;
    let df = standardize_dates(df.clone(), "merged")?;
    Ok(df
        .lazy()
        .select([
            col(columns::CITY).cast(DataType::String),
            col(columns::DATE),
            col(columns::TMAX_F).cast(DataType::Float64),
            col(columns::TMIN_F).cast(DataType::Float64),
            col(columns::ENERGY_MWH).cast(DataType::Float64),
        ])
        .collect()?)
}

/// All five summary tables for one batch.
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub correlation: DataFrame,
    pub weekday_weekend: DataFrame,
    pub seasonal: DataFrame,
    pub geographic: DataFrame,
    pub heatmap: DataFrame,
}

impl AnalysisOutputs {
    /// Each table paired with the file name it is published under.
    pub fn tables_mut(&mut self) -> [(&'static str, &mut DataFrame); 5] {
        [
            (CORRELATION_FILE, &mut self.correlation),
            (WEEKDAY_WEEKEND_FILE, &mut self.weekday_weekend),
            (SEASONAL_FILE, &mut self.seasonal),
            (GEOGRAPHIC_FILE, &mut self.geographic),
            (HEATMAP_FILE, &mut self.heatmap),
        ]
    }
}

pub fn generate_analysis_report(df: &DataFrame) -> Result<AnalysisOutputs, ProcessingError> {
    let prepared = prepare(df)?;
    let outputs = AnalysisOutputs {
        correlation: compute_correlation(&prepared)?,
        weekday_weekend: weekday_weekend_analysis(&prepared)?,
        seasonal: seasonal_pattern_analysis(&prepared)?,
        geographic: geographic_overview(&prepared)?,
        heatmap: heatmap_matrix(&prepared)?,
    };
    info!("Analysis complete over {} merged rows", prepared.height());
    Ok(outputs)
}
