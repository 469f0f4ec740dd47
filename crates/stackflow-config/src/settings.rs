//! 設定ファイルのモデルと環境変数による上書き

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use stackflow_api::config::verify_from_env;
use stackflow_api::{ApiConfig, HttpMethod};
use stackflow_cloud::PollConfig;
use std::path::Path;
use std::time::Duration;

/// stackflow 設定ファイルの内容
///
/// ```yaml
/// api:
///   endpoint: https://cloud.example.com/client/api
///   key: <api key>
///   secret: <secret key>
///   method: post
///   timeout_secs: 30
/// poll:
///   interval_secs: 2
///   timeout_secs: 900
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub poll: PollSettings,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
    pub method: Option<String>,
    pub timeout_secs: Option<u64>,
    pub verify_ssl: Option<bool>,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("endpoint", &self.endpoint)
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("method", &self.method)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: Option<u64>,
    pub max_interval_secs: Option<u64>,
    pub multiplier: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("設定ファイルを読み込み: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        // 空ファイルは環境変数のみの設定として扱う
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_yaml(&content, path)
    }

    /// `CLOUDSTACK_*` 環境変数で API 設定を上書き
    pub fn apply_env(&mut self) -> Result<()> {
        let api = &mut self.api;
        if let Ok(v) = std::env::var("CLOUDSTACK_ENDPOINT") {
            api.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("CLOUDSTACK_KEY") {
            api.key = Some(v);
        }
        if let Ok(v) = std::env::var("CLOUDSTACK_SECRET") {
            api.secret = Some(v);
        }
        if let Ok(v) = std::env::var("CLOUDSTACK_METHOD") {
            api.method = Some(v);
        }
        if let Ok(v) = std::env::var("CLOUDSTACK_TIMEOUT") {
            let secs = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("CLOUDSTACK_TIMEOUT が数値ではありません: {}", v))
            })?;
            api.timeout_secs = Some(secs);
        }
        if let Some(verify) = verify_from_env() {
            api.verify_ssl = Some(verify);
        }
        Ok(())
    }

    /// API セッションのパラメータ (endpoint, key, secret は必須)
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api = &self.api;
        let endpoint = non_empty(&api.endpoint).ok_or(ConfigError::Missing("endpoint"))?;
        let key = non_empty(&api.key).ok_or(ConfigError::Missing("key"))?;
        let secret = non_empty(&api.secret).ok_or(ConfigError::Missing("secret"))?;

        let mut config = ApiConfig::new(endpoint, key, secret);
        if let Some(method) = &api.method {
            let method: HttpMethod = method
                .parse()
                .map_err(|e: stackflow_api::ApiError| ConfigError::Invalid(e.to_string()))?;
            config = config.with_method(method);
        }
        if let Some(secs) = api.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(verify) = api.verify_ssl {
            config = config.with_verify_ssl(verify);
        }
        Ok(config)
    }

    /// 非同期ジョブのポーリング設定 (未指定はデフォルト値)
    ///
    /// 間隔 0、または 1.0 未満や有限でない倍率はエラー。
    pub fn poll_config(&self) -> Result<PollConfig> {
        let defaults = PollConfig::default();
        let poll = &self.poll;

        if poll.interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "poll.interval_secs は 1 以上を指定してください".to_string(),
            ));
        }
        if poll.max_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "poll.max_interval_secs は 1 以上を指定してください".to_string(),
            ));
        }
        match poll.multiplier {
            Some(multiplier) if !multiplier.is_finite() || multiplier < 1.0 => {
                return Err(ConfigError::Invalid(format!(
                    "poll.multiplier は 1.0 以上の有限値を指定してください: {}",
                    multiplier
                )));
            }
            _ => {}
        }

        Ok(PollConfig {
            interval: poll
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            max_interval: poll
                .max_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_interval),
            multiplier: poll.multiplier.unwrap_or(defaults.multiplier),
            timeout: poll
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
