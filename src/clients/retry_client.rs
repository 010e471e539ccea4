//! Outbound HTTP with bounded exponential backoff.
//!
//! Every upstream call in the crate goes through [`JsonSource::get_json`]. The
//! production implementation is [`RetryClient`], which retries transient
//! failures (5xx, 429, connection errors) and gives up immediately on any
//! other non-success status. Exhausting the retries always produces
//! [`FetchError::RetriesExhausted`]; callers decide whether that is fatal.

use crate::clients::error::FetchError;
use bon::Builder;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A GET request against one of the upstream JSON APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Last value given for a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Anything that can answer an [`ApiRequest`] with a JSON body.
pub trait JsonSource {
    fn get_json(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Outcome of a single attempt inside [`RetryPolicy::run`].
#[derive(Debug)]
pub enum AttemptError {
    /// Worth another try after the backoff delay.
    Transient(String),
    /// Stop now and surface this error.
    Fatal(FetchError),
}

/// How a response status is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal,
}

pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::Retryable
    } else {
        StatusClass::Fatal
    }
}

/// Attempt budget and backoff schedule.
///
/// The delay after failed attempt `n` is `base_delay * 2^(n-1)`.
///
/// ```
/// use gridpulse::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(4)
///     .base_delay(Duration::from_millis(500))
///     .build();
/// assert_eq!(policy.delay_after(1), Duration::from_millis(500));
/// assert_eq!(policy.delay_after(3), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RetryPolicy {
    #[builder(default = 3)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `attempt_fn` until it succeeds, fails fatally, or the attempt
    /// budget runs out. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, url: &str, mut attempt_fn: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => {
                    error!("{} on attempt {} - not retrying", e, attempt);
                    return Err(e);
                }
                Err(AttemptError::Transient(message)) => {
                    if attempt < max_attempts {
                        let wait = self.delay_after(attempt);
                        warn!(
                            "{} on attempt {} for {} - retrying in {:?}",
                            message, attempt, url, wait
                        );
                        tokio::time::sleep(wait).await;
                    } else {
                        error!("{} on attempt {} for {} - giving up", message, attempt, url);
                    }
                    last_error = message;
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}

/// `reqwest`-backed [`JsonSource`] with retries.
pub struct RetryClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self::with_client(client, policy))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<Value, AttemptError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                AttemptError::Fatal(FetchError::InvalidRequest {
                    url: request.url.clone(),
                    source: e,
                })
            } else {
                AttemptError::Transient(format!("Request error: {e}"))
            }
        })?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Retryable => {
                return Err(AttemptError::Transient(format!("HTTP error {status}")));
            }
            StatusClass::Fatal => {
                return Err(AttemptError::Fatal(FetchError::HttpStatus {
                    url: request.url.clone(),
                    status,
                }));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("Failed reading body: {e}")))?;
        debug!("Received {} bytes from {}", body.len(), request.url);

        serde_json::from_str(&body).map_err(|e| {
            AttemptError::Fatal(FetchError::InvalidJson {
                url: request.url.clone(),
                source: e,
            })
        })
    }
}

impl JsonSource for RetryClient {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        self.policy
            .run(&request.url, |_| self.attempt(request))
            .await
    }
}
