//! Transport layer: how a command reaches the CloudStack API
//!
//! The gateway only sees the [`Transport`] trait. [`HttpTransport`] is the
//! production implementation: signed query-string requests over HTTPS with
//! JSON responses.

use crate::args::Args;
use crate::config::{ApiConfig, HttpMethod};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Dispatches one API command and returns its decoded payload
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, command: &str, args: &Args) -> Result<Value>;
}

/// Signed HTTP transport
pub struct HttpTransport {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpTransport {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self { client, config })
    }

    fn signed_params(&self, command: &str, args: &Args) -> Result<Vec<(String, String)>> {
        let mut params = args.to_query_pairs();
        params.push(("command".to_string(), command.to_string()));
        params.push(("apiKey".to_string(), self.config.key.clone()));
        params.push(("response".to_string(), "json".to_string()));

        let signature = sign(&mut params, &self.config.secret)?;
        params.push(("signature".to_string(), signature));
        Ok(params)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, command: &str, args: &Args) -> Result<Value> {
        let params = self.signed_params(command, args)?;

        tracing::debug!(
            "{} {} command={} ({} params)",
            self.config.method,
            self.config.endpoint,
            command,
            args.len()
        );

        let request = match self.config.method {
            HttpMethod::Get => self.client.get(&self.config.endpoint).query(&params),
            HttpMethod::Post => self.client.post(&self.config.endpoint).form(&params),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Transport(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let payload = unwrap_envelope(payload);

        if !status.is_success() {
            let message = payload
                .get("errortext")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ApiError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        Ok(payload)
    }
}

/// Sort the parameters in place and compute the request signature
///
/// CloudStack signs the lower-cased, key-sorted query string with
/// HMAC-SHA1; spaces must be encoded as `%20`, not `+`.
pub fn sign(params: &mut [(String, String)], secret: &str) -> Result<String> {
    params.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect::<Vec<_>>()
        .join("&")
        .to_lowercase();

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::InvalidConfig(format!("invalid API secret: {}", e)))?;
    mac.update(query.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Strip the `<command>response` envelope CloudStack wraps every payload in
pub fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(map) if map.len() == 1 => {
            let (key, inner) = map.into_iter().next().unwrap_or_default();
            if key.ends_with("response") {
                inner
            } else {
                let mut map = serde_json::Map::new();
                map.insert(key, inner);
                Value::Object(map)
            }
        }
        other => other,
    }
}
