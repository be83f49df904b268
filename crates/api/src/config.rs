use tryon_core::imaging::DEFAULT_MAX_IMAGE_DIM;
use tryon_core::payload::IMAGEN_MODEL_ID;
use tryon_core::retry::RetryPolicy;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins from comma-separated `CORS_ORIGINS`; `*` allows any.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Must cover every retry of a
    /// prediction call.
    pub request_timeout_secs: u64,
    /// Maximum accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Longest edge input images are shrunk to before upload.
    pub max_image_dim: u32,
    /// Imagen model used when a background request names none.
    pub imagen_model: String,
    /// Retry ceiling for prediction calls.
    pub max_retries: u32,
    /// Base backoff between prediction retries, in seconds.
    pub backoff_secs: f64,
    /// Replaces the regional Vertex AI host (proxies, local mocks).
    pub vertex_base_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["*".into()],
            request_timeout_secs: 600,
            max_body_bytes: 32 * 1024 * 1024,
            max_image_dim: DEFAULT_MAX_IMAGE_DIM,
            imagen_model: IMAGEN_MODEL_ID.into(),
            max_retries: 3,
            backoff_secs: 2.0,
            vertex_base_url: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                        |
    /// | `PORT`                 | `8000`                           |
    /// | `CORS_ORIGINS`         | `*`                              |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                            |
    /// | `MAX_BODY_BYTES`       | `33554432`                       |
    /// | `MAX_IMAGE_DIM`        | `1280`                           |
    /// | `IMAGEN_MODEL_ID`      | `imagen-4.0-ultra-generate-001`  |
    /// | `VERTEX_MAX_RETRIES`   | `3`                              |
    /// | `VERTEX_BACKOFF_SECS`  | `2.0`                            |
    /// | `VERTEX_BASE_URL`      | regional endpoint                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(&get, "PORT", "a valid u16", defaults.port)?,
            cors_origins,
            request_timeout_secs: parse(
                &get,
                "REQUEST_TIMEOUT_SECS",
                "a valid u64",
                defaults.request_timeout_secs,
            )?,
            max_body_bytes: parse(&get, "MAX_BODY_BYTES", "a valid usize", defaults.max_body_bytes)?,
            max_image_dim: parse(&get, "MAX_IMAGE_DIM", "a valid u32", defaults.max_image_dim)?,
            imagen_model: get("IMAGEN_MODEL_ID").unwrap_or(defaults.imagen_model),
            max_retries: parse(&get, "VERTEX_MAX_RETRIES", "a valid u32", defaults.max_retries)?,
            backoff_secs: parse(
                &get,
                "VERTEX_BACKOFF_SECS",
                "a non-negative number",
                defaults.backoff_secs,
            )
            .and_then(|v: f64| {
                if v.is_finite() && v >= 0.0 {
                    Ok(v)
                } else {
                    Err(ConfigError {
                        var: "VERTEX_BACKOFF_SECS",
                        expected: "a non-negative number",
                        value: v.to_string(),
                    })
                }
            })?,
            vertex_base_url: get("VERTEX_BASE_URL"),
        })
    }

    /// Retry policy for prediction calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_secs)
    }

    /// True when `CORS_ORIGINS` contains the `*` wildcard.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse<T, G>(get: &G, var: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError {
            var,
            expected,
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.allows_any_origin());
        assert_eq!(config.max_image_dim, 1280);
        assert_eq!(config.imagen_model, "imagen-4.0-ultra-generate-001");
        assert_eq!(config.retry_policy().max_retries, 3);
        assert!(config.vertex_base_url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("PORT", "9001"),
            ("CORS_ORIGINS", "http://a.test, http://b.test ,"),
            ("MAX_IMAGE_DIM", "640"),
            ("VERTEX_MAX_RETRIES", "5"),
            ("VERTEX_BACKOFF_SECS", "0.25"),
            ("IMAGEN_MODEL_ID", "imagen-x"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(!config.allows_any_origin());
        assert_eq!(config.max_image_dim, 640);
        assert_eq!(config.imagen_model, "imagen-x");
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay.as_millis(), 250);
    }

    #[test]
    fn oversized_backoff_is_capped() {
        let config = config_from(&[("VERTEX_BACKOFF_SECS", "1e20")]).unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.initial_delay, policy.max_delay);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert!(config_from(&[("VERTEX_BACKOFF_SECS", "-1")]).is_err());
    }
}
