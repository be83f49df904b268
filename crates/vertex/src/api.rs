//! REST client for the Vertex AI publisher-model `:predict` endpoint.
//!
//! Wraps a single `POST .../models/{model}:predict` call using [`reqwest`]
//! and layers the bounded retry loop from [`RetryPolicy`] on top of it.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tryon_core::payload::PredictResponse;
use tryon_core::retry::{is_retryable_status, RetryPolicy};

/// Per-attempt HTTP timeout; generation routinely takes tens of seconds.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Identifies one publisher model in one project and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub project: String,
    pub location: String,
    pub model: String,
}

impl ModelTarget {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            model: model.into(),
        }
    }
}

/// HTTP client for Vertex AI predictions.
#[derive(Clone)]
pub struct VertexApi {
    client: reqwest::Client,
    /// Overrides the regional `https://{location}-aiplatform.googleapis.com` host.
    base_url: Option<String>,
}

/// Errors from the Vertex REST layer.
#[derive(Debug, thiserror::Error)]
pub enum VertexError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Vertex returned a non-2xx status code.
    #[error("Vertex AI API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, surfaced verbatim to callers.
        body: String,
        /// Server-requested wait from the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// The caller cancelled while a request or backoff wait was pending.
    #[error("Request cancelled")]
    Cancelled,
}

impl VertexError {
    /// Rate limiting, transient upstream errors, and connect/timeout
    /// failures are retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            VertexError::Api { status, .. } => is_retryable_status(*status),
            VertexError::Request(e) => e.is_timeout() || e.is_connect(),
            VertexError::Cancelled => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            VertexError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl VertexApi {
    /// Create a client targeting the public regional endpoints.
    pub fn new() -> Result<Self, VertexError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Create a client that sends every request to `base_url` instead of
    /// the regional host (mock servers, private proxies).
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: Some(base_url.into().trim_end_matches('/').to_string()),
        }
    }

    /// Full `:predict` URL for `target`.
    pub fn predict_url(&self, target: &ModelTarget) -> String {
        let host = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}-aiplatform.googleapis.com", target.location),
        };
        format!(
            "{host}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            target.project, target.location, target.model
        )
    }

    /// Issue a single prediction request.
    pub async fn predict<B>(
        &self,
        target: &ModelTarget,
        token: &str,
        body: &B,
    ) -> Result<PredictResponse, VertexError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.predict_url(target))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<PredictResponse>().await?)
    }

    /// Issue a prediction request, retrying retryable failures per `policy`.
    ///
    /// Returns the first success, the first non-retryable error, or the
    /// last error once `policy.max_retries` retries are spent. Triggering
    /// `cancel` aborts both in-flight requests and backoff waits.
    pub async fn predict_with_retry<B>(
        &self,
        target: &ModelTarget,
        token: &str,
        body: &B,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<PredictResponse, VertexError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut attempt = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(VertexError::Cancelled),
                result = self.predict(target, token, body) => result,
            };

            let err = match result {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            model = %target.model,
                            attempt = attempt + 1,
                            "Prediction succeeded after retry",
                        );
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= policy.max_retries {
                return Err(err);
            }

            let delay = policy.delay_with_hint(attempt, err.retry_after());
            tracing::warn!(
                model = %target.model,
                attempt = attempt + 1,
                max_attempts = policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Prediction attempt failed, retrying",
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(VertexError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`VertexError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, VertexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        tracing::warn!(status = status.as_u16(), body = %body, "Vertex AI returned an error");

        Err(VertexError::Api {
            status: status.as_u16(),
            body,
            retry_after,
        })
    }
}

/// Parse a delta-seconds `Retry-After` value. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_predict_url() {
        let api = VertexApi::new().unwrap();
        let target = ModelTarget::new("my-proj", "europe-west4", "virtual-try-on-001");
        assert_eq!(
            api.predict_url(&target),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/my-proj/locations/europe-west4/publishers/google/models/virtual-try-on-001:predict"
        );
    }

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let api = VertexApi::with_base_url(reqwest::Client::new(), "http://127.0.0.1:9000/");
        let target = ModelTarget::new("p", "us-central1", "m");
        assert_eq!(
            api.predict_url(&target),
            "http://127.0.0.1:9000/v1/projects/p/locations/us-central1/publishers/google/models/m:predict"
        );
    }

    #[test]
    fn retry_after_parsing() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn api_error_retryability_follows_status() {
        let err = |status| VertexError::Api {
            status,
            body: String::new(),
            retry_after: None,
        };
        assert!(err(429).is_retryable());
        assert!(err(503).is_retryable());
        assert!(!err(401).is_retryable());
        assert!(!err(413).is_retryable());
        assert!(!VertexError::Cancelled.is_retryable());
    }
}
