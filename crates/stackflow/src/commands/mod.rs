pub mod apply;
pub mod config_info;
pub mod lookup;

use stackflow_api::Gateway;
use stackflow_config::Settings;
use std::path::Path;

/// 設定を読み込んで API セッションを開く
pub fn connect(config: Option<&Path>) -> anyhow::Result<(Settings, Gateway)> {
    let settings = stackflow_config::load(config)?;
    let api = settings.api_config()?;
    tracing::debug!("エンドポイント: {}", api.endpoint);
    let gateway = Gateway::http(api)?;
    Ok((settings, gateway))
}
