//! stackflow の設定
//!
//! 設定ファイルを探して読み込み、`CLOUDSTACK_*` 環境変数で上書きする。

pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ApiSettings, PollSettings, Settings};

use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 2] = ["stackflow.local.yaml", "stackflow.yaml"];

/// ユーザー設定ディレクトリ配下の stackflow ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackflow"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. `explicit` (`--config` フラグ、存在しなければエラー)
/// 2. 環境変数 STACKFLOW_CONFIG
/// 3. カレントディレクトリ: stackflow.local.yaml, stackflow.yaml
/// 4. ./.stackflow/ ディレクトリ内: 同様の順序
/// 5. ~/.config/stackflow/config.yaml (グローバル設定)
///
/// 見つからなければ `Ok(None)`。その場合は環境変数のみで設定する。
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    // 2. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("STACKFLOW_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("STACKFLOW_CONFIG のファイルが存在しません: {}", path.display());
    }

    let current_dir = std::env::current_dir()?;
    // 3. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 4. ./.stackflow/ ディレクトリで検索
    let project_dir = current_dir.join(".stackflow");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    // 5. グローバル設定ファイル
    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join("config.yaml");
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// 設定ファイルを探して読み込み、環境変数で上書きする
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let mut settings = match find_config_file(explicit)? {
        Some(path) => Settings::from_file(&path)?,
        None => {
            tracing::debug!("設定ファイルなし、環境変数のみを使用");
            Settings::default()
        }
    };
    settings.apply_env()?;
    Ok(settings)
}
