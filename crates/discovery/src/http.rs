use crate::error::{DiscoveryError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Status and body of one HTTP exchange.
pub(crate) struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn into_status_error(self) -> DiscoveryError {
        DiscoveryError::Status {
            status: self.status.as_u16(),
            body: self.body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }
}

/// Thin JSON-over-HTTP client carrying the optional bearer token.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, token: Option<&str>, timeout: Duration) -> Result<HttpReply> {
        let builder = self.client.get(url);
        send(authorize(builder, token), timeout).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply> {
        let builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?);
        send(authorize(builder, token), timeout).await
    }
}

fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    let builder = builder.header(
        USER_AGENT,
        format!("CodeGuard/{}", codeguard_protocol::CODEGUARD_VERSION),
    );
    match token.filter(|t| !t.is_empty()) {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

async fn send(builder: RequestBuilder, timeout: Duration) -> Result<HttpReply> {
    let timed_out = || DiscoveryError::Timeout(timeout.as_millis() as u64);
    let response = builder.timeout(timeout).send().await.map_err(|err| {
        if err.is_timeout() {
            timed_out()
        } else {
            DiscoveryError::Http(err)
        }
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|err| {
        if err.is_timeout() {
            timed_out()
        } else {
            DiscoveryError::Http(err)
        }
    })?;
    Ok(HttpReply { status, body })
}

/// Validate a configured server URL; only http(s) is supported.
pub(crate) fn parse_server_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|err| DiscoveryError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(DiscoveryError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// `{url}/capabilities`, without doubling a trailing slash.
pub(crate) fn capabilities_url(url: &str) -> String {
    if url.ends_with('/') {
        format!("{url}capabilities")
    } else {
        format!("{url}/capabilities")
    }
}

pub(crate) fn rpc_request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Extract `result` from a JSON-RPC reply, surfacing an `error` member.
pub(crate) fn rpc_result(reply: Value) -> Result<Value> {
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(DiscoveryError::Rpc(message));
    }
    match reply {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| DiscoveryError::Rpc("response has no result".to_string())),
        _ => Err(DiscoveryError::Rpc("response is not an object".to_string())),
    }
}
