//! API gateway
//!
//! Every remote call of stackflow goes through [`Gateway::invoke`]. The
//! gateway does two things besides dispatching: it rejects empty command
//! names, and it folds both failure styles of the API (a transport error,
//! or a successful response carrying `errortext`) into one
//! [`ApiError::Remote`] that names the command. Calls are never retried:
//! mutating commands are not idempotent on the server side.

use crate::args::Args;
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::transport::{HttpTransport, Transport};
use serde_json::Value;
use std::sync::Arc;

const PAGE_SIZE: u64 = 500;

/// Shared handle to the remote API. Cheap to clone; holds no mutable state.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Gateway over the signed HTTP transport
    pub fn http(config: ApiConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Issue one command and return its payload unmodified
    pub async fn invoke(&self, command: &str, args: &Args) -> Result<Value> {
        if command.trim().is_empty() {
            return Err(ApiError::InvalidCommand);
        }

        tracing::debug!("API call: {} ({} args)", command, args.len());

        let payload = self
            .transport
            .call(command, args)
            .await
            .map_err(|e| match e {
                remote @ ApiError::Remote { .. } => remote,
                other => ApiError::remote(command, other.to_string()),
            })?;

        if let Some(text) = error_text(&payload) {
            tracing::debug!("API call {} returned errortext: {}", command, text);
            return Err(ApiError::remote(command, format!("Failed: '{}'", text)));
        }

        Ok(payload)
    }

    /// Issue a listing command and collect every page into one list
    ///
    /// If the caller already passed `page`, only that page is fetched.
    pub async fn list(&self, command: &str, args: &Args) -> Result<Vec<Value>> {
        if args.contains("page") {
            let payload = self.invoke(command, args).await?;
            return Ok(list_items(payload));
        }

        let mut items = Vec::new();
        let mut page = 1u64;

        loop {
            let paged = args
                .clone()
                .with("page", page)
                .with("pagesize", PAGE_SIZE);
            let payload = self.invoke(command, &paged).await?;
            let total = payload.get("count").and_then(Value::as_u64);

            let chunk = list_items(payload);
            let fetched = chunk.len() as u64;
            items.extend(chunk);

            let complete = total.is_some_and(|t| items.len() as u64 >= t);
            if fetched == 0 || fetched < PAGE_SIZE || complete {
                break;
            }
            page += 1;
        }

        tracing::debug!("API list {}: {} items", command, items.len());
        Ok(items)
    }
}

/// Non-empty `errortext` embedded in an otherwise successful payload
fn error_text(payload: &Value) -> Option<String> {
    match payload.get("errortext")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Items of a listing payload: the payload itself if it is already a list,
/// otherwise its first list-valued field (`count` sits beside it)
fn list_items(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn gateway() -> (Arc<MockTransport>, Gateway) {
        let mock = Arc::new(MockTransport::new());
        let gateway = Gateway::new(mock.clone());
        (mock, gateway)
    }

    #[tokio::test]
    async fn test_invoke_returns_payload() {
        let (mock, gateway) = gateway();
        mock.respond("listZones", json!({"count": 1, "zone": [{"id": "z1"}]}));

        let payload = gateway.invoke("listZones", &Args::new()).await.unwrap();
        assert_eq!(payload["zone"][0]["id"], "z1");
    }

    #[tokio::test]
    async fn test_invoke_rejects_empty_command() {
        let (mock, gateway) = gateway();
        let err = gateway.invoke("  ", &Args::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCommand));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_embedded_errortext_is_failure() {
        let (mock, gateway) = gateway();
        mock.respond(
            "updateConfiguration",
            json!({"errorcode": 431, "errortext": "Invalid value"}),
        );

        let err = gateway
            .invoke("updateConfiguration", &Args::new())
            .await
            .unwrap_err();
        match err {
            ApiError::Remote { command, message } => {
                assert_eq!(command, "updateConfiguration");
                assert_eq!(message, "Failed: 'Invalid value'");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_errortext_is_not_failure() {
        let (mock, gateway) = gateway();
        mock.respond("listZones", json!({"errortext": "", "zone": []}));
        assert!(gateway.invoke("listZones", &Args::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_transport_failure_is_normalized() {
        let (mock, gateway) = gateway();
        mock.fail("createVpnGateway", "connection reset");

        let err = gateway
            .invoke("createVpnGateway", &Args::new())
            .await
            .unwrap_err();
        match err {
            ApiError::Remote { command, message } => {
                assert_eq!(command, "createVpnGateway");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // no retry
        assert_eq!(mock.count("createVpnGateway"), 1);
    }

    #[tokio::test]
    async fn test_list_empty_response() {
        let (mock, gateway) = gateway();
        mock.respond("listVPCs", json!({}));
        assert!(gateway.list("listVPCs", &Args::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let (mock, gateway) = gateway();
        let first: Vec<Value> = (0..500).map(|i| json!({"id": i})).collect();
        mock.respond_once("listVirtualMachines", json!({"count": 501, "virtualmachine": first}));
        mock.respond_once(
            "listVirtualMachines",
            json!({"count": 501, "virtualmachine": [{"id": 500}]}),
        );

        let items = gateway
            .list("listVirtualMachines", &Args::new().with("zoneid", "z1"))
            .await
            .unwrap();

        assert_eq!(items.len(), 501);
        let calls = mock.calls_to("listVirtualMachines");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].get("page"), Some(&json!(2)));
        assert_eq!(calls[1].get_str("zoneid"), Some("z1"));
    }

    #[tokio::test]
    async fn test_list_accepts_preflattened_payload() {
        let (mock, gateway) = gateway();
        mock.respond("listClusters", json!([{"id": "c1"}, {"id": "c2"}]));
        let items = gateway.list("listClusters", &Args::new()).await.unwrap();
        assert_eq!(items.len(), 2);
    }
}
