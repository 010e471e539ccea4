//! Column access helpers shared by the merger, the quality report and the
//! analysis tables.

use crate::processing::error::ProcessingError;
use crate::types::records::{columns, MergedRecord};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Days between 0001-01-01 (day 1) and the Unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn require_columns(
    df: &DataFrame,
    table: &str,
    required: &[&str],
) -> Result<(), ProcessingError> {
    let present = df.get_column_names();
    for name in required {
        if !present.iter().any(|p| p.as_str() == *name) {
            return Err(ProcessingError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

macro_rules! get_column {
    ($df:expr, $table:expr, $name:expr) => {
        $df.column($name)
            .map_err(|_| ProcessingError::MissingColumn {
                table: $table.to_string(),
                column: $name.to_string(),
            })?
    };
}

pub fn f64_values(
    df: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Vec<Option<f64>>, ProcessingError> {
    let column = get_column!(df, table, name).cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn string_values(
    df: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Vec<Option<String>>, ProcessingError> {
    let column = get_column!(df, table, name).cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Reads a `Date` column back into chrono dates.
pub fn date_values(
    df: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Vec<Option<NaiveDate>>, ProcessingError> {
    let column = get_column!(df, table, name);
    if column.dtype() != &DataType::Date {
        return Err(ProcessingError::UnsupportedType {
            table: table.to_string(),
            column: name.to_string(),
            dtype: column.dtype().to_string(),
        });
    }
    let physical = column.cast(&DataType::Int32)?;
    Ok(physical
        .i32()?
        .into_iter()
        .map(|days| days.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + EPOCH_DAYS_FROM_CE)))
        .collect())
}

/// Parses `YYYY-MM-DD` or an ISO datetime (`YYYY-MM-DDTHH:MM:SS`, optionally
/// with fractional seconds) down to its calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Brings the `date` column to polars `Date`, whatever form it was read in.
///
/// Null dates stay null; a non-null value that is not a date is an error.
pub fn standardize_dates(mut df: DataFrame, table: &str) -> Result<DataFrame, ProcessingError> {
    let dtype = get_column!(df, table, columns::DATE).dtype().clone();
    match dtype {
        DataType::Date => Ok(df),
        DataType::Datetime(_, _) => {
            let dates = df.column(columns::DATE)?.cast(&DataType::Date)?;
            df.with_column(dates)?;
            Ok(df)
        }
        DataType::String => {
            let raw = string_values(&df, table, columns::DATE)?;
            let mut parsed = Vec::with_capacity(raw.len());
            for value in raw {
                match value {
                    None => parsed.push(None),
                    Some(text) => match parse_date(&text) {
                        Some(date) => parsed.push(Some(date)),
                        None => {
                            return Err(ProcessingError::InvalidDate {
                                table: table.to_string(),
                                value: text,
                            })
                        }
                    },
                }
            }
            df.with_column(Series::new(columns::DATE.into(), parsed))?;
            Ok(df)
        }
        other => Err(ProcessingError::UnsupportedType {
            table: table.to_string(),
            column: columns::DATE.to_string(),
            dtype: other.to_string(),
        }),
    }
}

/// Complete merged rows, in frame order. Rows with any null field are skipped.
pub fn merged_records(df: &DataFrame) -> Result<Vec<MergedRecord>, ProcessingError> {
    const TABLE: &str = "merged";
    let cities = string_values(df, TABLE, columns::CITY)?;
    let dates = date_values(df, TABLE, columns::DATE)?;
    let tmax = f64_values(df, TABLE, columns::TMAX_F)?;
    let tmin = f64_values(df, TABLE, columns::TMIN_F)?;
    let energy = f64_values(df, TABLE, columns::ENERGY_MWH)?;

    let records = cities
        .into_iter()
        .zip(dates)
        .zip(tmax.into_iter().zip(tmin).zip(energy))
        .filter_map(|((city, date), ((tmax_f, tmin_f), energy_mwh))| {
            Some(MergedRecord {
                city: city?,
                date: date?,
                tmax_f: tmax_f?,
                tmin_f: tmin_f?,
                energy_mwh: energy_mwh?,
            })
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::records::merged_frame;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_and_iso_dates() {
        assert_eq!(parse_date("2024-04-01"), Some(date(2024, 4, 1)));
        assert_eq!(parse_date("2024-04-01T00:00:00"), Some(date(2024, 4, 1)));
        assert_eq!(parse_date("2024-04-01 13:45:00.5"), Some(date(2024, 4, 1)));
        assert_eq!(parse_date("04/01/2024"), None);
    }

    #[test]
    fn standardizes_string_dates() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!(
            "city" => ["Chicago", "Chicago"],
            "date" => [Some("2024-04-01T00:00:00"), None],
        )?;
        let df = standardize_dates(df, "weather")?;
        assert_eq!(df.column("date")?.dtype(), &DataType::Date);
        assert_eq!(
            date_values(&df, "weather", "date")?,
            vec![Some(date(2024, 4, 1)), None]
        );
        Ok(())
    }

    #[test]
    fn rejects_garbage_dates() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!("date" => ["not a date"])?;
        let err = standardize_dates(df, "energy").unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidDate { .. }));
        Ok(())
    }

    #[test]
    fn missing_column_names_the_table() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!("city" => ["Phoenix"])?;
        match require_columns(&df, "energy", &["city", "energy_mwh"]) {
            Err(ProcessingError::MissingColumn { table, column }) => {
                assert_eq!(table, "energy");
                assert_eq!(column, "energy_mwh");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn merged_records_round_trip_through_frame() -> Result<(), Box<dyn std::error::Error>> {
        let rows = vec![MergedRecord {
            city: "Seattle".into(),
            date: date(2024, 1, 15),
            tmax_f: 45.5,
            tmin_f: 38.0,
            energy_mwh: 1210.0,
        }];
        let df = merged_frame(&rows)?;
        assert_eq!(merged_records(&df)?, rows);
        Ok(())
    }
}
