use anyhow::Context;
use colored::Colorize;
use stackflow_cloud::{OutputRecord, Reconciler, RunOptions};
use stackflow_cloudstack::{Entry, Manifest};
use std::path::Path;
use std::time::Duration;

pub async fn handle(
    config: Option<&Path>,
    timeout_secs: Option<u64>,
    manifest: &Path,
    check: bool,
    diff: bool,
) -> anyhow::Result<()> {
    // API 呼び出しの前にマニフェストを検証
    let entries = Manifest::load(manifest)?.entries()?;

    let (settings, gateway) = super::connect(config)?;
    let mut poll = settings.poll_config()?;
    if let Some(secs) = timeout_secs {
        poll = poll.with_timeout(Duration::from_secs(secs));
    }
    let reconciler = Reconciler::new(gateway, poll);

    if check {
        eprintln!("{}", "チェックモード: 変更は行いません".yellow());
    }

    let mut records = Vec::with_capacity(entries.len());
    for entry in &entries {
        let options = RunOptions {
            dry_run: check,
            poll_async: entry.poll_async,
            diff,
        };
        let record = reconciler
            .reconcile(entry.resource.as_ref(), &entry.scope, options, entry.state)
            .await
            .with_context(|| {
                format!(
                    "{} '{}' ({}) の適用に失敗しました",
                    entry.kind,
                    entry.resource.name(),
                    entry.state
                )
            })?;
        print_status(entry, &record);
        records.push(record);
    }

    println!("{}", serde_json::to_string_pretty(&records)?);

    let changed = records.iter().filter(|r| r.changed).count();
    eprintln!(
        "{}",
        format!(
            "{} 件のリソース: 変更 {} 件, 変更なし {} 件",
            records.len(),
            changed,
            records.len() - changed
        )
        .bold()
    );
    Ok(())
}

fn print_status(entry: &Entry, record: &OutputRecord) {
    let status = if record.changed {
        "changed".yellow()
    } else {
        "ok".green()
    };
    eprintln!(
        "{} {} '{}' ({})",
        status,
        entry.kind.cyan(),
        entry.resource.name(),
        entry.state
    );
}
