/// namecoind JSON-RPC backend
use super::{BackendError, BackendResult, NameBackend, NameEntry};
use crate::{
    config::RpcConfig,
    error::{KeyserverError, KeyserverResult},
    identity::IdentityName,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// namecoind reports unknown names with the wallet error code
const RPC_NAME_NOT_FOUND: i64 = -4;

/// Basic auth credentials for the RPC port
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCredentials {
    pub user: String,
    pub password: String,
}

impl RpcCredentials {
    /// Explicit user/password wins; otherwise fall back to the cookie file
    pub fn resolve(
        user: Option<String>,
        password: Option<String>,
        cookie_file: Option<&Path>,
    ) -> KeyserverResult<Option<Self>> {
        if let (Some(user), Some(password)) = (user, password) {
            return Ok(Some(Self { user, password }));
        }

        let Some(path) = cookie_file else {
            return Ok(None);
        };
        if !path.exists() {
            debug!("No RPC cookie file at {}", path.display());
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)?;
        let line = contents.lines().next().unwrap_or_default();
        let (user, password) = line.split_once(':').ok_or_else(|| {
            KeyserverError::Internal(format!("Malformed cookie file {}", path.display()))
        })?;

        Ok(Some(Self {
            user: user.to_string(),
            password: password.trim().to_string(),
        }))
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NameShowResult {
    value: Value,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    height: u64,
}

/// Talks to namecoind directly
pub struct CoinRpcBackend {
    url: String,
    credentials: Option<RpcCredentials>,
    http_client: reqwest::Client,
}

impl CoinRpcBackend {
    pub fn new(
        url: String,
        credentials: Option<RpcCredentials>,
        timeout: Duration,
    ) -> KeyserverResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyserverError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            credentials,
            http_client,
        })
    }

    /// Build from configuration, resolving credentials up front
    pub fn from_config(config: &RpcConfig, timeout: Duration) -> KeyserverResult<Self> {
        let credentials = RpcCredentials::resolve(
            config.user.clone(),
            config.password.clone(),
            config.cookie_file.as_deref(),
        )?;
        Self::new(config.url.clone(), credentials, timeout)
    }

    async fn call(&self, method: &str, params: Value) -> BackendResult<Value> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "nmc-keyserver",
            method,
            params,
        };

        let mut builder = self.http_client.post(&self.url).json(&request);
        if let Some(creds) = &self.credentials {
            builder = builder.basic_auth(&creds.user, Some(&creds.password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("{} failed: {}", method, e)))?;

        // namecoind answers RPC errors with HTTP 500 and a JSON body
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("{} body: {}", method, e)))?;

        let parsed: RpcResponse = serde_json::from_str(&body).map_err(|_| {
            if status.is_success() {
                BackendError::InvalidResponse(format!("{} returned non-JSON body", method))
            } else {
                BackendError::Transport(format!("{} returned HTTP {}", method, status))
            }
        })?;

        if let Some(err) = parsed.error {
            return Err(BackendError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(parsed.result)
    }

    /// Check that the node answers at all
    pub async fn ping(&self) -> BackendResult<()> {
        self.call("help", json!([])).await.map(|_| ())
    }
}

#[async_trait]
impl NameBackend for CoinRpcBackend {
    async fn name_show(&self, name: &IdentityName) -> BackendResult<NameEntry> {
        let result = match self.call("name_show", json!([name.as_str()])).await {
            Err(BackendError::Rpc { code, .. }) if code == RPC_NAME_NOT_FOUND => {
                return Err(BackendError::NotFound)
            }
            other => other?,
        };

        let shown: NameShowResult = serde_json::from_value(result)
            .map_err(|e| BackendError::InvalidResponse(format!("name_show: {}", e)))?;

        Ok(NameEntry {
            value: shown.value,
            expired: shown.expired,
            height: shown.height,
        })
    }

    async fn block_time(&self, height: u64) -> BackendResult<Option<i64>> {
        let hash = self.call("getblockhash", json!([height])).await?;
        let block = self.call("getblock", json!([hash])).await?;
        Ok(block.get("time").and_then(Value::as_i64))
    }
}
