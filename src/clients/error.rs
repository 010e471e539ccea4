use crate::types::data_kind::DataKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    // Transient failures (5xx, 429, connection problems) that outlived every retry.
    #[error("Request to {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Could not build request for {url}")]
    InvalidRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Response from {url} is not valid JSON")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected {kind} payload for {city}: {message}")]
    UpstreamSchema {
        kind: DataKind,
        city: String,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn schema(kind: DataKind, city: &str, message: impl Into<String>) -> Self {
        FetchError::UpstreamSchema {
            kind,
            city: city.to_string(),
            message: message.into(),
        }
    }
}
