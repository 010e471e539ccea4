//! Calendar and temperature bucketing used by the summary tables.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;

/// Weekday (Monday–Friday) versus weekend (Saturday–Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayType::Weekday => "Weekday",
            DayType::Weekend => "Weekend",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed ten-degree buckets of daily maximum temperature.
///
/// Lower bounds are inclusive: 60.0 °F falls in `60-70°F`, 90.0 °F in `>90°F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemperatureBand {
    Below50,
    From50To60,
    From60To70,
    From70To80,
    From80To90,
    Above90,
}

impl TemperatureBand {
    pub const ALL: [TemperatureBand; 6] = [
        TemperatureBand::Below50,
        TemperatureBand::From50To60,
        TemperatureBand::From60To70,
        TemperatureBand::From70To80,
        TemperatureBand::From80To90,
        TemperatureBand::Above90,
    ];

    pub fn of(tmax_f: f64) -> Self {
        if tmax_f < 50.0 {
            TemperatureBand::Below50
        } else if tmax_f < 60.0 {
            TemperatureBand::From50To60
        } else if tmax_f < 70.0 {
            TemperatureBand::From60To70
        } else if tmax_f < 80.0 {
            TemperatureBand::From70To80
        } else if tmax_f < 90.0 {
            TemperatureBand::From80To90
        } else {
            TemperatureBand::Above90
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemperatureBand::Below50 => "<50°F",
            TemperatureBand::From50To60 => "50-60°F",
            TemperatureBand::From60To70 => "60-70°F",
            TemperatureBand::From70To80 => "70-80°F",
            TemperatureBand::From80To90 => "80-90°F",
            TemperatureBand::Above90 => ">90°F",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TemperatureBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monday-first weekday order used for heatmap columns.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
