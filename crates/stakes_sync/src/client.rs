//! Read-only access to the deployed contract.
//!
//! [`HttpLedgerClient`] talks to a node's `call-read` endpoint.
//! [`RetryingClient`] wraps any [`ReadOnlyClient`] with exponential backoff
//! on rate limiting; every other failure surfaces on the first attempt.

use crate::config::{ConfigError, SyncConfig};
use crate::value::{ClarityValue, CodecError};
use async_trait::async_trait;
use derive_more::{Display, Error, From};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use stakes_ledger::Identity;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Failure of a single read-only call.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum ClientError {
    /// The node answered 429.
    #[display("Rate limited: {_0}")]
    RateLimited(#[error(not(source))] String),
    /// Non-success HTTP status other than 429.
    #[display("HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
    /// The request never produced a response.
    #[display("Transport error: {_0}")]
    Transport(#[error(not(source))] String),
    /// The node evaluated the call and refused it (`okay: false`).
    #[display("Call rejected: {_0}")]
    Rejected(#[error(not(source))] String),
    /// The response could not be decoded.
    #[display("Malformed response: {_0}")]
    #[from]
    Codec(CodecError),
    /// Retries were exhausted while the node kept rate limiting.
    #[display("Ledger unavailable after {attempts} attempts: {last}")]
    Unavailable {
        /// Attempts made, including the first.
        attempts: u32,
        /// Message of the final failure.
        last: String,
    },
}

const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "too many requests", "rate limit"];

impl ClientError {
    /// Whether retrying after a pause may succeed.
    ///
    /// Beyond an explicit 429, nodes and proxies report throttling only in
    /// message text, so messages are matched case-insensitively.
    pub fn is_rate_limited(&self) -> bool {
        let text = match self {
            Self::RateLimited(_) => return true,
            Self::Http { status: 429, .. } => return true,
            Self::Http { body, .. } => body,
            Self::Transport(message) | Self::Rejected(message) => message,
            Self::Codec(_) | Self::Unavailable { .. } => return false,
        };
        let lower = text.to_lowercase();
        RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

/// A source of read-only contract calls.
#[async_trait]
pub trait ReadOnlyClient: Send + Sync {
    /// Evaluates a read-only function with the given arguments.
    async fn call_read_only(
        &self,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError>;
}

#[derive(Debug, Serialize)]
struct ReadOnlyRequest<'a> {
    sender: &'a str,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReadOnlyResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

/// Read-only client for a node's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    contract: Identity,
    sender: String,
    client: reqwest::Client,
}

impl HttpLedgerClient {
    /// Builds a client from configuration.
    #[instrument(skip(config), fields(api_url = %config.api_url()))]
    pub fn new(config: &SyncConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: config.api_url().trim_end_matches('/').to_string(),
            contract: config.contract()?,
            sender: config.sender_identity()?.to_string(),
            client,
        })
    }

    fn url(&self, function: &str) -> String {
        format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url,
            self.contract.address(),
            self.contract.contract_name().unwrap_or_default(),
            function
        )
    }
}

#[async_trait]
impl ReadOnlyClient for HttpLedgerClient {
    #[instrument(skip(self, args), fields(args = args.len()))]
    async fn call_read_only(
        &self,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError> {
        let body = ReadOnlyRequest {
            sender: &self.sender,
            arguments: args
                .iter()
                .map(ClarityValue::to_hex)
                .collect::<Result<_, _>>()?,
        };

        let response = self
            .client
            .post(self.url(function))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited(status.to_string()));
        }
        if !status.is_success() {
            let body = body_text(response.text().await);
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ReadOnlyResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        debug!(okay = parsed.okay, "Read-only response");

        match (parsed.okay, parsed.result) {
            (true, Some(hex)) => Ok(ClarityValue::from_hex(&hex)?),
            (true, None) => Err(ClientError::Rejected("Response missing result".to_string())),
            (false, _) => Err(ClientError::Rejected(
                parsed.cause.unwrap_or_else(|| "unknown cause".to_string()),
            )),
        }
    }
}

/// Error-response body, or a note on why it could not be read.
fn body_text<E: std::fmt::Display>(read: Result<String, E>) -> String {
    read.unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

/// Backoff settings: the wait before retry `n` (zero-based) is
/// `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Setters)]
#[setters(prefix = "with_")]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    max_retries: u32,
    /// Wait before the first retry.
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(400))
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before retry `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Retries rate-limited calls of an inner client with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingClient<C> {
    /// Wraps a client.
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Backoff settings in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: ReadOnlyClient> ReadOnlyClient for RetryingClient<C> {
    #[instrument(skip(self, args), fields(max_retries = self.policy.max_retries))]
    async fn call_read_only(
        &self,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, ClientError> {
        let mut attempt = 0;
        loop {
            match self.inner.call_read_only(function, args).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_rate_limited() => return Err(err),
                Err(err) if attempt >= self.policy.max_retries => {
                    warn!(attempts = attempt + 1, error = %err, "Giving up on rate-limited read");
                    return Err(ClientError::Unavailable {
                        attempts: attempt + 1,
                        last: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
