use crate::analysis::prepare;
use crate::processing::error::ProcessingError;
use crate::types::calendar::DayType;
use crate::types::records::columns;
use log::info;
use polars::prelude::*;

/// Demand statistics split by weekday (Mon–Fri) versus weekend (Sat–Sun).
///
/// Columns are `day_type, mean, std, count`; `std` is the sample standard
/// deviation and is null for a group of one.
pub fn weekday_weekend_analysis(df: &DataFrame) -> Result<DataFrame, ProcessingError> {
    let df = prepare(df)?;
    // polars weekdays are ISO numbered: Monday = 1, Sunday = 7.
    let day_type = when(col(columns::DATE).dt().weekday().gt_eq(lit(6)))
        .then(lit(DayType::Weekend.label()))
        .otherwise(lit(DayType::Weekday.label()))
        .alias("day_type");

    let summary = df
        .lazy()
        .with_column(day_type)
        .group_by([col("day_type")])
        .agg([
            col(columns::ENERGY_MWH).mean().alias("mean"),
            col(columns::ENERGY_MWH).std(1).alias("std"),
            col(columns::ENERGY_MWH)
                .count()
                .cast(DataType::Int64)
                .alias("count"),
        ])
        .sort_by_exprs([col("day_type")], SortMultipleOptions::default())
        .collect()?;

    info!("Completed weekday vs weekend analysis");
    Ok(summary)
}
