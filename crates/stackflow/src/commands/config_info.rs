use std::path::Path;

pub async fn handle(config: Option<&Path>, name: Option<&str>) -> anyhow::Result<()> {
    let (_, gateway) = super::connect(config)?;
    let info = stackflow_cloudstack::configuration_info(&gateway, name).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
