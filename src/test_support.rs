//! In-memory upstreams and payload builders shared by the unit tests.

use crate::clients::error::FetchError;
use crate::clients::retry_client::{ApiRequest, JsonSource};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&ApiRequest) -> Result<Value, FetchError> + Send + Sync;

/// A [`JsonSource`] that answers every request with a closure and records
/// what it was asked.
pub struct ScriptedSource {
    handler: Arc<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedSource {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<Value, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl JsonSource for ScriptedSource {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// A NOAA `/data` page from `(date, datatype, value)` triples.
pub fn noaa_page(readings: &[(&str, &str, f64)]) -> Value {
    let results: Vec<Value> = readings
        .iter()
        .map(|(date, datatype, value)| {
            json!({
                "date": date,
                "datatype": datatype,
                "station": "GHCND:TEST",
                "attributes": ",,W,2400",
                "value": value,
            })
        })
        .collect();
    json!({ "results": results })
}

/// An EIA v2 page from `(period, timezone, value)` triples.
pub fn eia_page(rows: &[(&str, Option<&str>, Value)]) -> Value {
    let data: Vec<Value> = rows
        .iter()
        .map(|(period, timezone, value)| {
            let mut row = json!({
                "period": period,
                "respondent": "TEST",
                "type": "D",
                "value": value,
                "value-units": "megawatthours",
            });
            if let Some(tz) = timezone {
                row["timezone"] = json!(tz);
            }
            row
        })
        .collect();
    json!({ "response": { "total": data.len(), "data": data } })
}
