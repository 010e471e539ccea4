use crate::analysis::prepare;
use crate::processing::error::ProcessingError;
use crate::types::records::columns;
use log::info;
use polars::prelude::*;

/// Mean demand per (city, calendar month): `city, month, avg_energy_mwh`.
pub fn seasonal_pattern_analysis(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    let df = prepare(df)?;
    let monthly = df
        .lazy()
        .with_column(col(columns::DATE).dt().month().cast(DataType::Int32).alias("month"))
        .group_by([col(columns::CITY), col("month")])
        .agg([col(columns::ENERGY_MWH).mean().alias("avg_energy_mwh")])
        .sort_by_exprs(
            [col(columns::CITY), col("month")],
            SortMultipleOptions::default(),
        )
        .collect()?;

    info!("Completed seasonal pattern analysis");
    Ok(monthly)
}
