/// NMControl backend
///
/// NMControl speaks a bare JSON request/response over TCP: the client writes
/// one request object and reads until the server closes the connection.
use super::{decode_embedded_json, BackendError, BackendResult, NameBackend, NameEntry};
use crate::identity::IdentityName;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

pub struct NmControlBackend {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NmControlBackend {
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }

    async fn call(&self, method: &str, params: Value) -> BackendResult<Value> {
        let request = json!({ "method": method, "params": params }).to_string();
        let addr = format!("{}:{}", self.host, self.port);

        let exchange = async {
            let mut stream = TcpStream::connect(&addr).await?;
            stream.write_all(request.as_bytes()).await?;
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        };

        let raw = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| BackendError::Transport(format!("NMControl at {} timed out", addr)))?
            .map_err(|e| BackendError::Transport(format!("NMControl at {}: {}", addr, e)))?;

        let response: Value = serde_json::from_slice(&raw)
            .map_err(|e| BackendError::InvalidResponse(format!("NMControl reply: {}", e)))?;

        match response.get("error") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(err) => {
                return Err(BackendError::Rpc {
                    code: err.get("code").and_then(Value::as_i64).unwrap_or(-1),
                    message: err
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| err.to_string()),
                })
            }
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Check that NMControl answers at all
    pub async fn ping(&self) -> BackendResult<()> {
        self.call("help", json!([])).await.map(|_| ())
    }
}

#[async_trait]
impl NameBackend for NmControlBackend {
    async fn name_show(&self, name: &IdentityName) -> BackendResult<NameEntry> {
        let result = self
            .call("data", json!(["getData", name.as_str()]))
            .await?;

        let reply = result.get("reply").cloned().unwrap_or(Value::Bool(false));
        if reply == Value::Bool(false) || reply.is_null() {
            return Err(BackendError::NotFound);
        }

        let data = decode_embedded_json(reply);
        debug!("NMControl getData {}: {}", name, data);

        let value = data
            .get("value")
            .cloned()
            .ok_or_else(|| BackendError::InvalidResponse("reply has no value".to_string()))?;

        Ok(NameEntry {
            value,
            expired: data.get("expired").and_then(Value::as_bool).unwrap_or(false),
            height: data.get("height").and_then(Value::as_u64).unwrap_or(0),
        })
    }
}
