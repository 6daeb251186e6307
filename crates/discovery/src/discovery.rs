use crate::error::{DiscoveryError, Result};
use crate::http::{capabilities_url, parse_server_url, rpc_request, rpc_result, HttpClient};
use crate::inference::{map_capabilities, CapabilityInference, KeywordInference};
use crate::provider::{builtin_providers, Provider};
use crate::remote::RemoteProvider;
use codeguard_protocol::MCP_PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

/// One configured remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Per-request timeout while probing a server.
    pub probe_timeout: Duration,
    /// Timeout for `tools/call` on discovered providers.
    pub run_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            run_timeout: Duration::from_secs(60),
        }
    }
}

/// What happened during one discovery cycle, for the host to surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Skipped duplicate names first, then one entry per server that failed,
    /// each in configuration order.
    pub warnings: Vec<String>,
    /// True when the built-in providers were returned.
    pub used_builtin: bool,
}

pub struct Discovered {
    pub providers: Vec<Arc<dyn Provider>>,
    pub report: DiscoveryReport,
}

/// Which probe last worked for a server URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeRoute {
    Rest,
    Rpc,
}

/// Discovers providers from configured servers. Cheap to clone; clones
/// share the probe cache.
#[derive(Clone)]
pub struct Discovery {
    http: HttpClient,
    config: DiscoveryConfig,
    inference: Arc<dyn CapabilityInference>,
    routes: Arc<Mutex<HashMap<String, ProbeRoute>>>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            config,
            inference: Arc::new(KeywordInference),
            routes: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn with_inference(mut self, inference: Arc<dyn CapabilityInference>) -> Self {
        self.inference = inference;
        self
    }

    pub fn config(&self) -> DiscoveryConfig {
        self.config
    }

    /// Providers for `servers`; never empty.
    pub async fn discover(&self, servers: &[ServerConfig]) -> Vec<Arc<dyn Provider>> {
        self.discover_with_report(servers).await.providers
    }

    /// Provider names are unique in the result: a server whose name was
    /// already taken earlier in `servers` is skipped with a warning.
    pub async fn discover_with_report(&self, servers: &[ServerConfig]) -> Discovered {
        let mut report = DiscoveryReport::default();
        let servers = unique_by_name(servers, &mut report.warnings);
        let servers = servers.as_slice();
        if servers.is_empty() {
            log::info!("No MCP servers configured. Using built-in providers.");
            report.used_builtin = true;
            return Discovered {
                providers: builtin_providers(),
                report,
            };
        }

        let mut probes = JoinSet::new();
        for (index, server) in servers.iter().cloned().enumerate() {
            let this = self.clone();
            probes.spawn(async move {
                let outcome = this.discover_server(&server).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<Arc<dyn Provider>>>> =
            servers.iter().map(|_| None).collect();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => log::warn!("Discovery task failed: {err}"),
            }
        }

        let mut providers = Vec::new();
        for (server, outcome) in servers.iter().zip(outcomes) {
            match outcome {
                Some(Ok(provider)) => providers.push(provider),
                Some(Err(err)) => {
                    log::warn!("MCP server \"{}\" is not responding: {err}", server.name);
                    report
                        .warnings
                        .push(format!("MCP server \"{}\" is not responding: {err}", server.name));
                }
                None => report
                    .warnings
                    .push(format!("MCP server \"{}\" discovery was aborted", server.name)),
            }
        }

        if providers.is_empty() {
            log::warn!("No MCP servers are responding. Using built-in providers.");
            report.used_builtin = true;
            providers = builtin_providers();
        }
        Discovered { providers, report }
    }

    async fn discover_server(&self, server: &ServerConfig) -> Result<Arc<dyn Provider>> {
        parse_server_url(&server.url)?;
        let capabilities = self.probe(server).await?;
        let mapped = map_capabilities(&capabilities, &server.name, self.inference.as_ref());
        log::debug!(
            "Discovered {} capabilities from {}",
            mapped.len(),
            server.name
        );
        Ok(Arc::new(RemoteProvider::new(
            server.clone(),
            mapped,
            self.http.clone(),
            self.config.run_timeout,
        )))
    }

    /// Capabilities object of `server`. A server known to need RPC is asked
    /// over RPC directly; a cached route that fails is forgotten.
    async fn probe(&self, server: &ServerConfig) -> Result<Value> {
        let outcome = match self.cached_route(&server.url) {
            Some(ProbeRoute::Rpc) => self.probe_rpc(server).await.map(|c| (c, ProbeRoute::Rpc)),
            _ => self.probe_rest(server).await,
        };
        let mut routes = self
            .routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match outcome {
            Ok((capabilities, route)) => {
                routes.insert(server.url.clone(), route);
                Ok(capabilities)
            }
            Err(err) => {
                routes.remove(&server.url);
                Err(err)
            }
        }
    }

    fn cached_route(&self, url: &str) -> Option<ProbeRoute> {
        self.routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .copied()
    }

    async fn probe_rest(&self, server: &ServerConfig) -> Result<(Value, ProbeRoute)> {
        let reply = self
            .http
            .get(
                &capabilities_url(&server.url),
                server.token.as_deref(),
                self.config.probe_timeout,
            )
            .await?;
        if reply.status.as_u16() == 404 {
            log::debug!("{} has no /capabilities endpoint, trying RPC", server.name);
            return Ok((self.probe_rpc(server).await?, ProbeRoute::Rpc));
        }
        if !reply.status.is_success() {
            return Err(reply.into_status_error());
        }
        let capabilities = capabilities_object(reply.json()?)?;
        Ok((capabilities, ProbeRoute::Rest))
    }

    async fn probe_rpc(&self, server: &ServerConfig) -> Result<Value> {
        let request = rpc_request(
            1,
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "clientInfo": {
                    "name": "CodeGuard MCP",
                    "version": codeguard_protocol::CODEGUARD_VERSION,
                },
            }),
        );
        let result = self.rpc_call(server, &request).await?;
        let mut capabilities = capabilities_object(result)?;

        // MCP servers announce tool support as an object and list the tools
        // separately.
        if capabilities.get("tools").is_some_and(Value::is_object) {
            let list = rpc_request(2, "tools/list", json!({}));
            match self.rpc_call(server, &list).await {
                Ok(listed) => {
                    if let Some(tools) = listed.get("tools").filter(|t| t.is_array()) {
                        capabilities["tools"] = tools.clone();
                    }
                }
                Err(err) => log::debug!("tools/list failed on {}: {err}", server.name),
            }
        }
        Ok(capabilities)
    }

    async fn rpc_call(&self, server: &ServerConfig, request: &Value) -> Result<Value> {
        let reply = self
            .http
            .post_json(
                &server.url,
                server.token.as_deref(),
                request,
                self.config.probe_timeout,
            )
            .await?;
        if !reply.status.is_success() {
            return Err(reply.into_status_error());
        }
        rpc_result(reply.json()?)
    }
}

fn unique_by_name(servers: &[ServerConfig], warnings: &mut Vec<String>) -> Vec<ServerConfig> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(servers.len());
    for server in servers {
        if seen.insert(server.name.as_str()) {
            unique.push(server.clone());
        } else {
            let warning = format!(
                "MCP server \"{}\" at {} ignored: name already used by an earlier server",
                server.name, server.url
            );
            log::warn!("{warning}");
            warnings.push(warning);
        }
    }
    unique
}

fn capabilities_object(mut body: Value) -> Result<Value> {
    match body.get_mut("capabilities").map(Value::take) {
        Some(capabilities @ Value::Object(_)) => Ok(capabilities),
        _ => Err(DiscoveryError::MissingCapabilities),
    }
}
