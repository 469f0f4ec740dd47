//! Read-only configuration listing

use serde_json::{Map, Value, json};
use stackflow_api::{Args, Gateway, Result};

const INFO_RETURNS: &[(&str, &str)] = &[
    ("name", "name"),
    ("value", "value"),
    ("description", "description"),
];

/// Configurations, optionally only those named `name`, as
/// `{"configurations": [{name, value, description}, ...]}`
pub async fn configuration_info(gateway: &Gateway, name: Option<&str>) -> Result<Value> {
    let args = Args::new().with_opt("name", name);
    let configurations = gateway.list("listConfigurations", &args).await?;

    let projected: Vec<Value> = configurations
        .iter()
        .map(|c| {
            let mut fields = Map::new();
            for (remote, output) in INFO_RETURNS {
                if let Some(v) = c.get(*remote) {
                    fields.insert((*output).to_string(), v.clone());
                }
            }
            Value::Object(fields)
        })
        .collect();

    Ok(json!({ "configurations": projected }))
}
