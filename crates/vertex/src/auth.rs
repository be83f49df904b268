//! OAuth access-token resolution for Vertex AI calls.
//!
//! Tokens come from an explicit value, the `ACCESS_TOKEN` environment
//! variable, or Application Default Credentials via the `gcloud` CLI.
//! [`TokenChain`] tries a list of sources in order.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Environment variable consulted by [`EnvToken::default`].
pub const ACCESS_TOKEN_ENV: &str = "ACCESS_TOKEN";

/// ADC tokens live for an hour; refresh well before that.
const GCLOUD_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Upper bound on one `gcloud` invocation, e.g. when it stalls on reauth.
const GCLOUD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No source produced a token.
    #[error("{0}")]
    Missing(String),

    /// A source exists but failed to produce a token.
    #[error("{source_name} token lookup failed: {message}")]
    Source {
        source_name: &'static str,
        message: String,
    },
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, e.g. from `--access-token`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        non_empty(self.0.clone(), self.name())
    }
}

/// Reads the token from an environment variable at call time.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        let value = std::env::var(&self.var).map_err(|_| AuthError::Source {
            source_name: self.name(),
            message: format!("{} is not set", self.var),
        })?;
        non_empty(value, self.name())
    }
}

/// Application Default Credentials through
/// `gcloud auth application-default print-access-token`.
///
/// Successful lookups are cached for [`GCLOUD_TOKEN_TTL`]. A lookup that
/// outlives its timeout, or whose caller goes away, kills the child.
pub struct GcloudToken {
    program: String,
    timeout: Duration,
    cached: Mutex<Option<(String, Instant)>>,
}

impl GcloudToken {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: GCLOUD_TIMEOUT,
            cached: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GcloudToken {
    fn default() -> Self {
        Self::new("gcloud")
    }
}

#[async_trait]
impl TokenProvider for GcloudToken {
    fn name(&self) -> &'static str {
        "gcloud"
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < GCLOUD_TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        let child = tokio::process::Command::new(&self.program)
            .args(["auth", "application-default", "print-access-token"])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| AuthError::Source {
                source_name: self.name(),
                message: format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs_f64()
                ),
            })?
            .map_err(|e| AuthError::Source {
                source_name: self.name(),
                message: format!("failed to run {}: {e}", self.program),
            })?;

        if !output.status.success() {
            return Err(AuthError::Source {
                source_name: self.name(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let token = non_empty(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
            self.name(),
        )?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// Tries each provider in order and returns the first token found.
pub struct TokenChain {
    providers: Vec<Box<dyn TokenProvider>>,
    missing_message: String,
}

impl TokenChain {
    pub fn new(providers: Vec<Box<dyn TokenProvider>>, missing_message: impl Into<String>) -> Self {
        Self {
            providers,
            missing_message: missing_message.into(),
        }
    }

    /// Explicit `--access-token` first, then `ACCESS_TOKEN`.
    pub fn for_cli(explicit: Option<String>) -> Self {
        let mut providers: Vec<Box<dyn TokenProvider>> = Vec::new();
        if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
            providers.push(Box::new(StaticToken::new(token.trim())));
        }
        providers.push(Box::new(EnvToken::default()));
        Self::new(
            providers,
            "Missing access token. Provide --access-token or set ACCESS_TOKEN.",
        )
    }

    /// ADC via `gcloud` first (auto-refreshing), then `ACCESS_TOKEN`.
    pub fn for_server() -> Self {
        Self::new(
            vec![Box::new(GcloudToken::default()), Box::new(EnvToken::default())],
            "Missing access token. Run `gcloud auth application-default login` \
             or set ACCESS_TOKEN.",
        )
    }
}

#[async_trait]
impl TokenProvider for TokenChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        for provider in &self.providers {
            match provider.access_token().await {
                Ok(token) => {
                    tracing::debug!(source = provider.name(), "Resolved access token");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(source = provider.name(), error = %e, "Token source unavailable");
                }
            }
        }
        Err(AuthError::Missing(self.missing_message.clone()))
    }
}

fn non_empty(token: String, source_name: &'static str) -> Result<String, AuthError> {
    if token.trim().is_empty() {
        return Err(AuthError::Source {
            source_name,
            message: "token is empty".into(),
        });
    }
    Ok(token)
}
