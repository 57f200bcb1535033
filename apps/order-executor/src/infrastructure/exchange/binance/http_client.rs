//! Signed REST client with retry logic for idempotent requests.
//!
//! Signed requests carry `timestamp` and `recvWindow`, sorted with the rest of
//! the parameters and signed over the exact query string that is sent. Order
//! placement is never retried: a lost response leaves the outcome unknown and
//! a blind retry could double-place.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use super::api_types::BinanceErrorResponse;
use super::config::{BinanceConfig, RetryConfig};
use super::error::BinanceError;
use super::signer::{RequestSigner, SignedParams};
use crate::observability::record_exchange_request;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// HTTP client for the Binance futures REST API.
#[derive(Clone)]
pub struct BinanceHttpClient {
    client: Client,
    api_key: String,
    signer: RequestSigner,
    base_url: String,
    recv_window_ms: u128,
    retry_config: RetryConfig,
}

impl BinanceHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(BinanceError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            signer: RequestSigner::new(config.api_secret.clone()),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window.as_millis(),
            retry_config: config.retry.clone(),
        })
    }

    /// Unsigned GET (market metadata).
    pub async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &SignedParams,
    ) -> Result<T, BinanceError> {
        self.request(Method::GET, path, params, false).await
    }

    /// Signed GET.
    pub async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &SignedParams,
    ) -> Result<T, BinanceError> {
        self.request(Method::GET, path, params, true).await
    }

    /// Signed POST. Sent exactly once.
    pub async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &SignedParams,
    ) -> Result<T, BinanceError> {
        self.request(Method::POST, path, params, true).await
    }

    /// Signed DELETE.
    pub async fn delete_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &SignedParams,
    ) -> Result<T, BinanceError> {
        self.request(Method::DELETE, path, params, true).await
    }

    /// Internal request implementation with retry logic.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &SignedParams,
        signed: bool,
    ) -> Result<T, BinanceError> {
        let retryable = method != Method::POST;
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            let err = match self.send_once(&method, path, params, signed).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !retryable || !err.is_transient() {
                return Err(err);
            }

            let Some(delay) = backoff.next_backoff() else {
                return Err(BinanceError::MaxRetriesExceeded {
                    attempts: backoff.attempt,
                    last_error: err.to_string(),
                });
            };
            let delay = with_jitter(delay);

            tracing::warn!(
                method = %method,
                path,
                error = %err,
                delay_ms = delay.as_millis(),
                attempt = backoff.attempt,
                "Transient exchange error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One HTTP round trip. Signed requests get a fresh timestamp each time.
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        params: &SignedParams,
        signed: bool,
    ) -> Result<T, BinanceError> {
        let query = if signed {
            let params = params
                .clone()
                .with("recvWindow", self.recv_window_ms)
                .with("timestamp", chrono::Utc::now().timestamp_millis());
            self.signer.signed_query(&params)
        } else {
            params.canonical_query()
        };

        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };

        let mut request = self.client.request(method.clone(), &url);
        if signed {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let started = Instant::now();
        // The URL carries the signature, so it is stripped from transport errors.
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                record_exchange_request(path, "network_error", started.elapsed().as_secs_f64());
                return Err(BinanceError::Network(e.without_url().to_string()));
            }
        };

        let status = response.status();
        record_exchange_request(path, status.as_str(), started.elapsed().as_secs_f64());

        let body = response
            .text()
            .await
            .map_err(|e| BinanceError::Network(e.without_url().to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| BinanceError::JsonParse(e.to_string()));
        }

        let err = classify_error(status, &body);
        tracing::debug!(method = %method, path, status = status.as_u16(), error = %err, "Exchange request failed");
        Err(err)
    }
}

impl fmt::Debug for BinanceHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceHttpClient")
            .field("api_key", &"<redacted>")
            .field("signer", &self.signer)
            .field("base_url", &self.base_url)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("retry_config", &self.retry_config)
            .finish_non_exhaustive()
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        418 | 429 => ErrorCategory::RateLimited,
        408 | 500..=599 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Map a non-success response to a [`BinanceError`].
fn classify_error(status: StatusCode, body: &str) -> BinanceError {
    let parsed = serde_json::from_str::<BinanceErrorResponse>(body).ok();

    match categorize_status(status) {
        ErrorCategory::RateLimited => match parsed {
            Some(err) => BinanceError::Api {
                code: err.code,
                message: err.msg,
                status: status.as_u16(),
            },
            None => BinanceError::RateLimited {
                status: status.as_u16(),
            },
        },
        ErrorCategory::Retryable => BinanceError::Server {
            status: status.as_u16(),
            message: parsed.map_or_else(|| body.to_string(), |err| err.msg),
        },
        ErrorCategory::NonRetryable => match parsed {
            Some(err) => BinanceError::Api {
                code: err.code,
                message: err.msg,
                status: status.as_u16(),
            },
            None => BinanceError::UnexpectedStatus {
                status: status.as_u16(),
                message: body.to_string(),
            },
        },
    }
}

/// Add up to 50% random jitter to a backoff delay.
fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_secs_f64() / 2.0;
    if max_jitter <= 0.0 {
        return delay;
    }
    let jitter = rand::rng().random_range(0.0..max_jitter);
    delay + Duration::from_secs_f64(jitter)
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
