/// Naming backend abstraction
///
/// The gateway only needs two things from the naming ledger: the current
/// value of a name, and (optionally) the time of the block a record was
/// last updated in. Every transport implements [`NameBackend`].

pub mod auto;
pub mod coin_rpc;
pub mod discovery;
pub mod memory;
pub mod nmcontrol;

pub use auto::AutoBackend;
pub use coin_rpc::CoinRpcBackend;
pub use memory::MemoryBackend;
pub use nmcontrol::NmControlBackend;

use crate::{
    config::{BackendConfig, ServerConfig},
    error::KeyserverResult,
    identity::IdentityName,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Raw name entry as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct NameEntry {
    /// Either a JSON string to be decoded or an already decoded value
    pub value: Value,
    pub expired: bool,
    pub height: u64,
}

/// Typed backend failures
#[derive(Error, Debug)]
pub enum BackendError {
    /// Name was never registered
    #[error("name does not exist")]
    NotFound,

    /// Connection, timeout or HTTP level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with an error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Backend answered with something we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Source of identity records
#[async_trait]
pub trait NameBackend: Send + Sync {
    /// Look up the current entry for a name
    async fn name_show(&self, name: &IdentityName) -> BackendResult<NameEntry>;

    /// Unix time of the block at `height`, if this backend can tell
    async fn block_time(&self, _height: u64) -> BackendResult<Option<i64>> {
        Ok(None)
    }
}

/// Build the backend selected in the configuration
pub fn from_config(config: &ServerConfig) -> KeyserverResult<Arc<dyn NameBackend>> {
    let timeout = config.http_timeout();
    let backend: Arc<dyn NameBackend> = match &config.backend {
        BackendConfig::Rpc(rpc) => {
            tracing::info!("Using namecoind RPC backend at {}", rpc.url);
            Arc::new(CoinRpcBackend::from_config(rpc, timeout)?)
        }
        BackendConfig::NmControl(nmcontrol) => {
            tracing::info!(
                "Using NMControl backend at {}:{}",
                nmcontrol.host,
                nmcontrol.port
            );
            Arc::new(NmControlBackend::new(
                nmcontrol.host.clone(),
                nmcontrol.port,
                timeout,
            ))
        }
        BackendConfig::Auto { nmcontrol, rpc } => {
            tracing::info!(
                "Detecting backend: NMControl at {}:{}, then namecoind at {}",
                nmcontrol.host,
                nmcontrol.port,
                rpc.url
            );
            Arc::new(AutoBackend::new(
                NmControlBackend::new(nmcontrol.host.clone(), nmcontrol.port, timeout),
                CoinRpcBackend::from_config(rpc, timeout)?,
            ))
        }
        BackendConfig::File { path } => {
            tracing::info!("Using names file {}", path.display());
            Arc::new(MemoryBackend::from_file(path)?)
        }
    };
    Ok(backend)
}

/// Read a field that may hold either JSON text or a decoded value
pub(crate) fn decode_embedded_json(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}
