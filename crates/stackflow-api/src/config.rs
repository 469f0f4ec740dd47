//! Connection settings for a CloudStack endpoint

use crate::error::{ApiError, Result};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP method used for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl std::str::FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            other => Err(ApiError::InvalidConfig(format!(
                "unsupported HTTP method '{}' (expected get or post)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "get"),
            HttpMethod::Post => write!(f, "post"),
        }
    }
}

/// Session parameters, supplied once per session
#[derive(Clone)]
pub struct ApiConfig {
    pub endpoint: String,
    pub key: String,
    pub secret: String,
    pub method: HttpMethod,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

impl ApiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: normalize_endpoint(&endpoint.into()),
            key: key.into(),
            secret: secret.into(),
            method: HttpMethod::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_ssl: true,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Create ApiConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("CLOUDSTACK_ENDPOINT")
            .map_err(|_| ApiError::MissingEnvVar("CLOUDSTACK_ENDPOINT".to_string()))?;
        let key = std::env::var("CLOUDSTACK_KEY")
            .map_err(|_| ApiError::MissingEnvVar("CLOUDSTACK_KEY".to_string()))?;
        let secret = std::env::var("CLOUDSTACK_SECRET")
            .map_err(|_| ApiError::MissingEnvVar("CLOUDSTACK_SECRET".to_string()))?;

        let mut config = Self::new(endpoint, key, secret);

        if let Ok(method) = std::env::var("CLOUDSTACK_METHOD") {
            config.method = method.parse()?;
        }
        if let Ok(timeout) = std::env::var("CLOUDSTACK_TIMEOUT") {
            let secs = timeout.trim().parse::<u64>().map_err(|_| {
                ApiError::InvalidConfig(format!("CLOUDSTACK_TIMEOUT is not a number: {}", timeout))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(verify) = verify_from_env() {
            config.verify_ssl = verify;
        }

        Ok(config)
    }
}

/// TLS verification switch from `CLOUDSTACK_VERIFY` or
/// `CLOUDSTACK_DANGEROUS_NO_TLS_VERIFY` (the latter wins when both are set)
pub fn verify_from_env() -> Option<bool> {
    if let Ok(v) = std::env::var("CLOUDSTACK_DANGEROUS_NO_TLS_VERIFY") {
        return Some(!parse_flag(&v));
    }
    std::env::var("CLOUDSTACK_VERIFY").ok().map(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Prefix `https://` when the endpoint carries no scheme
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("cloud.example.com/client/api"),
            "https://cloud.example.com/client/api"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/client/api"),
            "http://localhost:8080/client/api"
        );
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("put".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("CLOUDSTACK_ENDPOINT", Some("cloud.example.com/client/api")),
                ("CLOUDSTACK_KEY", Some("key")),
                ("CLOUDSTACK_SECRET", Some("secret")),
                ("CLOUDSTACK_METHOD", Some("POST")),
                ("CLOUDSTACK_TIMEOUT", Some("30")),
                ("CLOUDSTACK_VERIFY", None),
                ("CLOUDSTACK_DANGEROUS_NO_TLS_VERIFY", Some("true")),
            ],
            || {
                let config = ApiConfig::from_env().unwrap();
                assert_eq!(config.endpoint, "https://cloud.example.com/client/api");
                assert_eq!(config.method, HttpMethod::Post);
                assert_eq!(config.timeout, Duration::from_secs(30));
                assert!(!config.verify_ssl);
            },
        );
    }

    #[test]
    fn test_from_env_missing_secret() {
        temp_env::with_vars(
            [
                ("CLOUDSTACK_ENDPOINT", Some("https://cloud.example.com")),
                ("CLOUDSTACK_KEY", Some("key")),
                ("CLOUDSTACK_SECRET", None),
            ],
            || match ApiConfig::from_env() {
                Err(ApiError::MissingEnvVar(name)) => assert_eq!(name, "CLOUDSTACK_SECRET"),
                other => panic!("expected MissingEnvVar, got {:?}", other),
            },
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = ApiConfig::new("https://x", "key", "topsecret");
        assert!(!format!("{:?}", config).contains("topsecret"));
    }
}
