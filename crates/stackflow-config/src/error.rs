use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error("設定ファイルが見つかりません: {0}")]
    FileNotFound(PathBuf),

    #[error(
        "API 設定がありません: {0}\n\
        設定ファイルの api セクション、または環境変数 \
        CLOUDSTACK_ENDPOINT, CLOUDSTACK_KEY, CLOUDSTACK_SECRET で指定してください"
    )]
    Missing(&'static str),

    #[error("設定値が不正です: {0}")]
    Invalid(String),

    #[error("{path} の解析に失敗しました: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
