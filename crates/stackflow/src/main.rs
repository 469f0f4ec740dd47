mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "CloudStack のリソースを宣言どおりの状態にする", long_about = None)]
struct Cli {
    /// 設定ファイル (省略時は自動検出)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 非同期ジョブを待つ最大秒数
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストのリソースを順に適用
    Apply {
        /// マニフェストファイル (YAML)
        manifest: PathBuf,
        /// 変更せずに差分だけを報告
        #[arg(long)]
        check: bool,
        /// 出力に変更前後の属性を含める
        #[arg(long)]
        diff: bool,
    },
    /// 読み取り専用の API コマンドを実行して結果を表示
    Lookup {
        /// API コマンド名 (例: listZones)
        command: String,
        /// クエリパラメータ
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = commands::lookup::parse_param)]
        params: Vec<(String, String)>,
    },
    /// 設定値 (configuration) の一覧を表示
    ConfigInfo {
        /// 指定した設定のみ表示
        #[arg(short, long)]
        name: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 標準出力は JSON のみ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Apply {
            manifest,
            check,
            diff,
        } => {
            commands::apply::handle(config, cli.timeout_secs, &manifest, check, diff).await?;
        }
        Commands::Lookup { command, params } => {
            commands::lookup::handle(config, &command, params).await?;
        }
        Commands::ConfigInfo { name } => {
            commands::config_info::handle(config, name.as_deref()).await?;
        }
        Commands::Version => {
            unreachable!("Version は設定の読み込み前に処理済み");
        }
    }

    Ok(())
}
