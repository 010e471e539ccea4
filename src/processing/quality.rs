//! Data-quality findings over the joined (pre-cleaning) table.
//!
//! Findings are never fatal. They are logged as warnings and written out so
//! downstream consumers can decide how much to trust a batch.

use crate::processing::error::ProcessingError;
use crate::processing::extract::{date_values, f64_values, string_values};
use crate::types::records::columns;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::fmt;

/// Plausible range for a daily temperature in °F, inclusive.
pub const TEMPERATURE_RANGE_F: (f64, f64) = (-50.0, 130.0);
/// A batch whose newest row is at most this many days old is fresh.
pub const FRESHNESS_DAYS: i64 = 2;

/// Scope label used for a report covering every city at once.
pub const AGGREGATE_SCOPE: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCheck {
    MissingValues,
    TemperatureOutliers,
    EnergyIssues,
    DataFreshness,
}

impl QualityCheck {
    pub fn name(&self) -> &'static str {
        match self {
            QualityCheck::MissingValues => "missing_values",
            QualityCheck::TemperatureOutliers => "temperature_outliers",
            QualityCheck::EnergyIssues => "energy_issues",
            QualityCheck::DataFreshness => "data_freshness",
        }
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityRow {
    pub check: QualityCheck,
    pub column: Option<String>,
    pub count: Option<i64>,
    pub note: Option<String>,
    /// Only set on the freshness row.
    pub is_fresh: Option<bool>,
}

impl QualityRow {
    fn finding(check: QualityCheck, column: Option<&str>, count: usize) -> Self {
        Self {
            check,
            column: column.map(str::to_string),
            count: Some(count as i64),
            note: None,
            is_fresh: None,
        }
    }
}

/// Quality findings for one city, or for the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub scope: String,
    pub rows: Vec<QualityRow>,
}

impl QualityReport {
    pub fn rows_for(&self, check: QualityCheck) -> impl Iterator<Item = &QualityRow> {
        self.rows.iter().filter(move |r| r.check == check)
    }

    pub fn freshness(&self) -> Option<&QualityRow> {
        self.rows_for(QualityCheck::DataFreshness).next()
    }

    /// `city, check, column, count, note, is_fresh`
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        Self::frame_of(std::slice::from_ref(self))
    }

    /// Stacks several reports into one table, in order.
    pub fn frame_of(reports: &[QualityReport]) -> PolarsResult<DataFrame> {
        let rows: Vec<(&str, &QualityRow)> = reports
            .iter()
            .flat_map(|r| r.rows.iter().map(move |row| (r.scope.as_str(), row)))
            .collect();
        df!(
            "city" => rows.iter().map(|(scope, _)| *scope).collect::<Vec<_>>(),
            "check" => rows.iter().map(|(_, r)| r.check.name()).collect::<Vec<_>>(),
            "column" => rows.iter().map(|(_, r)| r.column.as_deref()).collect::<Vec<_>>(),
            "count" => rows.iter().map(|(_, r)| r.count).collect::<Vec<_>>(),
            "note" => rows.iter().map(|(_, r)| r.note.as_deref()).collect::<Vec<_>>(),
            "is_fresh" => rows.iter().map(|(_, r)| r.is_fresh).collect::<Vec<_>>(),
        )
    }
}

fn is_temperature_outlier(value: Option<f64>) -> bool {
    let (low, high) = TEMPERATURE_RANGE_F;
    value.is_some_and(|v| v < low || v > high)
}

/// Runs every check against `df` and returns the findings in check order.
///
/// `today` is the reference date for the freshness check.
pub fn generate_quality_report(
    df: &DataFrame,
    scope: &str,
    today: NaiveDate,
) -> Result<QualityReport, ProcessingError> {
    const TABLE: &str = "joined";
    let mut rows = Vec::new();

    for column in df.get_columns() {
        let nulls = column.null_count();
        if nulls > 0 {
            warn!("{}: {} missing values in '{}'", scope, nulls, column.name());
            rows.push(QualityRow::finding(
                QualityCheck::MissingValues,
                Some(column.name().as_str()),
                nulls,
            ));
        }
    }

    let tmax = f64_values(df, TABLE, columns::TMAX_F)?;
    let tmin = f64_values(df, TABLE, columns::TMIN_F)?;
    let outliers = tmax
        .iter()
        .zip(&tmin)
        .filter(|(hi, lo)| is_temperature_outlier(**hi) || is_temperature_outlier(**lo))
        .count();
    if outliers > 0 {
        warn!("{}: {} temperature outlier rows", scope, outliers);
        rows.push(QualityRow::finding(
            QualityCheck::TemperatureOutliers,
            None,
            outliers,
        ));
    }

    let energy_issues = f64_values(df, TABLE, columns::ENERGY_MWH)?
        .into_iter()
        .filter(|v| v.map_or(true, |mwh| mwh < 0.0))
        .count();
    if energy_issues > 0 {
        warn!("{}: {} rows with missing or negative energy", scope, energy_issues);
        rows.push(QualityRow::finding(
            QualityCheck::EnergyIssues,
            Some(columns::ENERGY_MWH),
            energy_issues,
        ));
    }

    rows.push(freshness_row(df, scope, today)?);

    Ok(QualityReport {
        scope: scope.to_string(),
        rows,
    })
}

fn freshness_row(
    df: &DataFrame,
    scope: &str,
    today: NaiveDate,
) -> Result<QualityRow, ProcessingError> {
    let latest = date_values(df, "joined", columns::DATE)?
        .into_iter()
        .flatten()
        .max();

    let row = match latest {
        Some(latest) => {
            let days = (today - latest).num_days();
            let is_fresh = days <= FRESHNESS_DAYS;
            info!(
                "{}: {} days since last record ({})",
                scope, days, latest
            );
            if !is_fresh {
                warn!("{}: data is stale, last record {}", scope, latest);
            }
            QualityRow {
                check: QualityCheck::DataFreshness,
                column: Some(columns::DATE.to_string()),
                count: Some(days),
                note: Some(latest.to_string()),
                is_fresh: Some(is_fresh),
            }
        }
        None => {
            warn!("{}: no records to judge freshness", scope);
            QualityRow {
                check: QualityCheck::DataFreshness,
                column: Some(columns::DATE.to_string()),
                count: None,
                note: Some("no records".to_string()),
                is_fresh: Some(false),
            }
        }
    };
    Ok(row)
}

/// One report per city present in `df`, in order of first appearance.
pub fn generate_city_reports(
    df: &DataFrame,
    today: NaiveDate,
) -> Result<Vec<QualityReport>, ProcessingError> {
    let mut cities: Vec<String> = Vec::new();
    for city in string_values(df, "joined", columns::CITY)?.into_iter().flatten() {
        if !cities.contains(&city) {
            cities.push(city);
        }
    }

    cities
        .iter()
        .map(|city| {
            let subset = df
                .clone()
                .lazy()
                .filter(col(columns::CITY).eq(lit(city.as_str())))
                .collect()?;
            generate_quality_report(&subset, city, today)
        })
        .collect()
}
