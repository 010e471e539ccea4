//! The fixed set of cities the pipeline tracks, and how each one maps onto the
//! two upstream sources.

use std::fmt;

/// A city tracked by the pipeline.
///
/// Each city pairs a NOAA GHCND weather station with an EIA balancing-authority
/// respondent code. `timezone` is the EIA timezone facet used to pick a single
/// series when the respondent reports several.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct City {
    pub name: String,
    pub station_id: String,
    pub region_code: String,
    pub timezone: String,
}

impl City {
    pub fn new(
        name: impl Into<String>,
        station_id: impl Into<String>,
        region_code: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            station_id: station_id.into(),
            region_code: region_code.into(),
            timezone: timezone.into(),
        }
    }

    /// File-name friendly form of the city name.
    ///
    /// ```
    /// use gridpulse::City;
    ///
    /// let city = City::new("New York", "GHCND:USW00094728", "NYIS", "Eastern");
    /// assert_eq!(city.slug(), "new_york");
    /// ```
    pub fn slug(&self) -> String {
        city_slug(&self.name)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Lowercases a city name and replaces whitespace with underscores.
pub fn city_slug(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// The five cities covered by a default run.
pub fn default_cities() -> Vec<City> {
    vec![
        City::new("New York", "GHCND:USW00094728", "NYIS", "Eastern"),
        City::new("Chicago", "GHCND:USW00094846", "PJM", "Central"),
        City::new("Houston", "GHCND:USW00012960", "ERCO", "Central"),
        City::new("Phoenix", "GHCND:USW00023183", "AZPS", "Arizona"),
        City::new("Seattle", "GHCND:USW00024233", "SCL", "Pacific"),
    ]
}
