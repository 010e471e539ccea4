use std::fmt;

/// The tables the pipeline can run out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// NOAA daily TMAX/TMIN readings.
    Weather,
    /// EIA daily demand.
    Energy,
    /// The (city, date) join of the two.
    Merged,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Weather => f.write_str("weather"),
            DataKind::Energy => f.write_str("energy"),
            DataKind::Merged => f.write_str("merged"),
        }
    }
}
