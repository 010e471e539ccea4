//! EIA v2 daily demand by balancing-authority respondent.

use crate::clients::error::FetchError;
use crate::clients::retry_client::{ApiRequest, JsonSource};
use crate::clients::window::FetchWindow;
use crate::types::city::City;
use crate::types::data_kind::DataKind;
use crate::types::records::EnergyRecord;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const EIA_DAILY_URL: &str = "https://api.eia.gov/v2/electricity/rto/daily-region-data/data/";
pub const DEFAULT_PAGE_SIZE: usize = 5000;
pub const DEFAULT_MAX_PAGES: usize = 10;
/// EIA series code for demand; the same endpoint also serves forecast (DF),
/// net generation (NG) and interchange (TI).
const DEMAND_TYPE: &str = "D";

#[derive(Debug, Deserialize)]
struct EiaRow {
    period: String,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default, rename = "type")]
    series_type: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

pub struct EnergyClient<'a, S> {
    source: &'a S,
    api_key: &'a str,
    page_size: usize,
    max_pages: usize,
}

impl<'a, S: JsonSource> EnergyClient<'a, S> {
    pub fn new(source: &'a S, api_key: &'a str) -> Self {
        Self {
            source,
            api_key,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_paging(mut self, page_size: usize, max_pages: usize) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetches one city's daily demand, restricted to the city's timezone
    /// series, renamed to `energy_mwh` and trimmed to the window.
    pub async fn fetch_city(
        &self,
        city: &City,
        window: &FetchWindow,
    ) -> Result<Vec<EnergyRecord>, FetchError> {
        info!(
            "Fetching energy for {} from {} to {}",
            city, window.start, window.end
        );

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut offset = 0;
        let mut dropped_values = 0;

        for page in 1..=self.max_pages {
            let request = ApiRequest::new(EIA_DAILY_URL)
                .query("api_key", self.api_key)
                .query("frequency", "daily")
                .query("start", window.start)
                .query("end", window.end)
                .query("data[0]", "value")
                .query("facets[respondent][]", &city.region_code)
                .query("facets[timezone][]", &city.timezone)
                .query("facets[type][]", DEMAND_TYPE)
                .query("sort[0][column]", "period")
                .query("sort[0][direction]", "asc")
                .query("offset", offset)
                .query("length", self.page_size);

            let body = self.source.get_json(&request).await?;
            let rows = parse_rows(city, &body)?;
            let count = rows.len();
            debug!("{}: energy page {} returned {} rows", city, page, count);

            for row in rows {
                if !matches_timezone(row.timezone.as_deref(), &city.timezone)
                    || !is_demand(row.series_type.as_deref())
                {
                    continue;
                }
                let date = NaiveDate::parse_from_str(row.period.trim(), "%Y-%m-%d").map_err(|e| {
                    FetchError::schema(
                        DataKind::Energy,
                        &city.name,
                        format!("unparseable period '{}': {e}", row.period),
                    )
                })?;
                match row.value.as_ref().and_then(coerce_number) {
                    // First value wins for duplicate dates.
                    Some(value) => {
                        by_date.entry(date).or_insert(value);
                    }
                    None => dropped_values += 1,
                }
            }

            if count < self.page_size {
                break;
            }
            if page == self.max_pages {
                warn!("{}: stopped paging energy after {} pages", city, self.max_pages);
            }
            offset += count;
        }

        if dropped_values > 0 {
            warn!(
                "{}: dropped {} energy rows with non-numeric values",
                city, dropped_values
            );
        }
        if by_date.is_empty() {
            warn!("No energy data for {}", city);
            return Ok(Vec::new());
        }

        let skip = by_date.len().saturating_sub(window.retained_days);
        let records: Vec<EnergyRecord> = by_date
            .into_iter()
            .skip(skip)
            .map(|(date, energy_mwh)| EnergyRecord {
                city: city.name.clone(),
                date,
                energy_mwh,
            })
            .collect();

        info!("Energy data ready for {}: {} records", city, records.len());
        Ok(records)
    }
}

fn parse_rows(city: &City, body: &Value) -> Result<Vec<EiaRow>, FetchError> {
    let response = body
        .get("response")
        .ok_or_else(|| FetchError::schema(DataKind::Energy, &city.name, "missing 'response'"))?;
    let data = response
        .get("data")
        .ok_or_else(|| {
            FetchError::schema(DataKind::Energy, &city.name, "missing 'response.data'")
        })?
        .as_array()
        .ok_or_else(|| {
            FetchError::schema(DataKind::Energy, &city.name, "'response.data' is not an array")
        })?;

    data.iter()
        .map(|entry| {
            EiaRow::deserialize(entry).map_err(|e| {
                FetchError::schema(DataKind::Energy, &city.name, format!("malformed row: {e}"))
            })
        })
        .collect()
}

/// Rows without a timezone are kept; EIA only sends it for mixed series.
fn matches_timezone(row_timezone: Option<&str>, wanted: &str) -> bool {
    row_timezone.map_or(true, |tz| tz.eq_ignore_ascii_case(wanted))
}

fn is_demand(series_type: Option<&str>) -> bool {
    series_type.map_or(true, |t| t.trim().eq_ignore_ascii_case(DEMAND_TYPE))
}

/// EIA returns demand either as a JSON number or as a numeric string.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{eia_page, ScriptedSource};
    use serde_json::json;

    fn test_city() -> City {
        City::new("Seattle", "GHCND:USW00024233", "SCL", "Pacific")
    }

    fn window(retained_days: usize) -> FetchWindow {
        FetchWindow {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
            retained_days,
        }
    }

    #[tokio::test]
    async fn renames_value_to_energy_mwh() {
        let source = ScriptedSource::new(|_| {
            Ok(json!({
                "response": {
                    "data": [
                        { "period": "2024-04-01", "value": 2541.3, "respondent": "SCL" }
                    ]
                }
            }))
        });
        let client = EnergyClient::new(&source, "key");

        let records = client.fetch_city(&test_city(), &window(90)).await.unwrap();

        assert_eq!(
            records,
            vec![EnergyRecord {
                city: "Seattle".into(),
                date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                energy_mwh: 2541.3,
            }]
        );
    }

    #[tokio::test]
    async fn keeps_only_the_city_timezone() {
        let source = ScriptedSource::new(|_| {
            Ok(eia_page(&[
                ("2024-04-01", Some("Pacific"), json!("1200")),
                ("2024-04-01", Some("Eastern"), json!(9999)),
                ("2024-04-02", Some("Pacific"), json!(1300.5)),
                ("2024-04-03", Some("Pacific"), json!("n/a")),
            ]))
        });
        let client = EnergyClient::new(&source, "key");

        let records = client.fetch_city(&test_city(), &window(90)).await.unwrap();

        let values: Vec<f64> = records.iter().map(|r| r.energy_mwh).collect();
        assert_eq!(values, [1200.0, 1300.5]);
    }

    #[tokio::test]
    async fn ignores_non_demand_series() {
        let source = ScriptedSource::new(|_| {
            Ok(json!({
                "response": {
                    "data": [
                        { "period": "2024-04-01", "type": "NG", "value": 5000 },
                        { "period": "2024-04-01", "type": "DF", "value": 4200 },
                        { "period": "2024-04-01", "type": "D", "value": 1000 },
                        { "period": "2024-04-02", "type": "TI", "value": -300 },
                        { "period": "2024-04-02", "value": 1100 }
                    ]
                }
            }))
        });
        let client = EnergyClient::new(&source, "key");

        let records = client.fetch_city(&test_city(), &window(90)).await.unwrap();

        let values: Vec<f64> = records.iter().map(|r| r.energy_mwh).collect();
        assert_eq!(values, [1000.0, 1100.0]);
    }

    #[tokio::test]
    async fn trims_to_most_recent_days() {
        let source = ScriptedSource::new(|_| {
            Ok(eia_page(&[
                ("2024-04-01", None, json!(1.0)),
                ("2024-04-02", None, json!(2.0)),
                ("2024-04-03", None, json!(3.0)),
            ]))
        });
        let client = EnergyClient::new(&source, "key");

        let records = client.fetch_city(&test_city(), &window(2)).await.unwrap();

        let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, ["2024-04-02", "2024-04-03"]);
    }

    #[tokio::test]
    async fn sends_region_facets_and_key() {
        let source = ScriptedSource::new(|_| Ok(eia_page(&[])));
        let client = EnergyClient::new(&source, "abc123");

        let records = client.fetch_city(&test_city(), &window(90)).await.unwrap();

        assert!(records.is_empty());
        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_value("api_key"), Some("abc123"));
        assert_eq!(requests[0].query_value("facets[respondent][]"), Some("SCL"));
        assert_eq!(requests[0].query_value("facets[timezone][]"), Some("Pacific"));
        assert_eq!(requests[0].query_value("facets[type][]"), Some("D"));
        assert_eq!(requests[0].query_value("offset"), Some("0"));
    }

    #[tokio::test]
    async fn missing_response_is_a_schema_error() {
        let source = ScriptedSource::new(|_| Ok(json!({})));
        let client = EnergyClient::new(&source, "key");
        let result = client.fetch_city(&test_city(), &window(90)).await;
        assert!(matches!(result, Err(FetchError::UpstreamSchema { .. })));
    }

    #[tokio::test]
    async fn missing_data_key_is_a_schema_error() {
        let source = ScriptedSource::new(|_| Ok(json!({ "response": {} })));
        let client = EnergyClient::new(&source, "key");
        let result = client.fetch_city(&test_city(), &window(90)).await;
        match result {
            Err(FetchError::UpstreamSchema { message, .. }) => {
                assert!(message.contains("response.data"))
            }
            other => panic!("expected UpstreamSchema, got {other:?}"),
        }
    }

    #[test]
    fn coerces_numeric_strings() {
        assert_eq!(coerce_number(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(coerce_number(&json!(7)), Some(7.0));
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
    }
}
