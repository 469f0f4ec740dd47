use stackflow_api::Args;
use std::path::Path;

/// `key=value` 形式のクエリパラメータを解析
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("key=value 形式で指定してください: '{}'", s)),
    }
}

pub async fn handle(
    config: Option<&Path>,
    command: &str,
    params: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let (_, gateway) = super::connect(config)?;

    let mut args = Args::new();
    for (key, value) in params {
        args.set(key, value);
    }

    let result = stackflow_api::lookup(&gateway, command, &args).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("name=web-01").unwrap(),
            ("name".to_string(), "web-01".to_string())
        );
        assert_eq!(
            parse_param("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_param("listall=").unwrap().1, "");
    }

    #[test]
    fn test_parse_param_invalid() {
        assert!(parse_param("name").is_err());
        assert!(parse_param("=value").is_err());
    }
}
