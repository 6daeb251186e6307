use crate::discovery::ServerConfig;
use crate::error::{DiscoveryError, Result};
use crate::http::{rpc_request, rpc_result, HttpClient};
use crate::provider::Provider;
use async_trait::async_trait;
use codeguard_protocol::Capability;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Provider backed by a discovered server; runs tools via JSON-RPC
/// `tools/call`.
pub struct RemoteProvider {
    server: ServerConfig,
    capabilities: Vec<Capability>,
    http: HttpClient,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RemoteProvider {
    pub(crate) fn new(
        server: ServerConfig,
        capabilities: Vec<Capability>,
        http: HttpClient,
        timeout: Duration,
    ) -> Self {
        Self {
            server,
            capabilities,
            http,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.server.url
    }
}

impl std::fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("name", &self.server.name)
            .field("url", &self.server.url)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

#[async_trait]
impl Provider for RemoteProvider {
    fn name(&self) -> &str {
        &self.server.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn run(&self, capability_id: &str, command: &str, args: &Value) -> Result<Value> {
        if self.capability(capability_id).is_none() {
            return Err(DiscoveryError::UnknownCapability {
                provider: self.server.name.clone(),
                capability: capability_id.to_string(),
            });
        }

        let mut arguments = args.as_object().cloned().unwrap_or_else(Map::new);
        arguments.insert("command".to_string(), Value::String(command.to_string()));
        let request = rpc_request(
            self.next_id.fetch_add(1, Ordering::Relaxed),
            "tools/call",
            json!({ "name": capability_id, "arguments": arguments }),
        );

        log::debug!("tools/call {capability_id} ({command}) on {}", self.server.name);
        let reply = self
            .http
            .post_json(&self.server.url, self.server.token.as_deref(), &request, self.timeout)
            .await?;
        if !reply.status.is_success() {
            return Err(reply.into_status_error());
        }
        tool_call_payload(rpc_result(reply.json()?)?)
    }
}

/// Raw tool response from a `tools/call` result: `structuredContent` when
/// present, else the first text content parsed as JSON (plain text is
/// wrapped as `output`).
fn tool_call_payload(result: Value) -> Result<Value> {
    let first_text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.iter().find_map(|item| item.get("text").and_then(Value::as_str)))
        .map(str::to_string);

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(DiscoveryError::Rpc(
            first_text.unwrap_or_else(|| "tool reported an error".to_string()),
        ));
    }
    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        return Ok(structured.clone());
    }
    match first_text {
        Some(text) => Ok(serde_json::from_str(&text)
            .unwrap_or_else(|_| json!({ "success": true, "output": text }))),
        None => Ok(result),
    }
}
