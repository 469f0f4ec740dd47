//! Read-only pass-through queries

use crate::args::Args;
use crate::error::Result;
use crate::gateway::Gateway;
use serde_json::Value;

/// Run `command` once with `params` and return the raw result as a list
pub async fn lookup(gateway: &Gateway, command: &str, params: &Args) -> Result<Vec<Value>> {
    let payload = gateway.invoke(command, params).await?;

    Ok(match payload {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    })
}
