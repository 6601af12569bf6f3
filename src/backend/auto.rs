/// Backend that picks NMControl or namecoind on first use
use super::{BackendError, BackendResult, CoinRpcBackend, NameBackend, NameEntry, NmControlBackend};
use crate::identity::IdentityName;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detected {
    NmControl,
    CoinRpc,
}

/// NMControl is tried first and namecoind second. The first backend that
/// answers is kept; if neither answers, detection runs again on the next call.
pub struct AutoBackend {
    nmcontrol: NmControlBackend,
    rpc: CoinRpcBackend,
    detected: OnceCell<Detected>,
}

impl AutoBackend {
    pub fn new(nmcontrol: NmControlBackend, rpc: CoinRpcBackend) -> Self {
        Self {
            nmcontrol,
            rpc,
            detected: OnceCell::new(),
        }
    }

    pub async fn detect(&self) -> BackendResult<Detected> {
        self.detected
            .get_or_try_init(|| async {
                let nmcontrol_err = match self.nmcontrol.ping().await {
                    Ok(()) => {
                        info!("Detected NMControl backend");
                        return Ok(Detected::NmControl);
                    }
                    Err(e) => e,
                };

                match self.rpc.ping().await {
                    Ok(()) => {
                        info!("NMControl unavailable ({}), using namecoind RPC", nmcontrol_err);
                        Ok(Detected::CoinRpc)
                    }
                    Err(rpc_err) => {
                        warn!("No naming backend reachable");
                        Err(BackendError::Transport(format!(
                            "auto detection failed: NMControl: {}; namecoind: {}",
                            nmcontrol_err, rpc_err
                        )))
                    }
                }
            })
            .await
            .copied()
    }
}

#[async_trait]
impl NameBackend for AutoBackend {
    async fn name_show(&self, name: &IdentityName) -> BackendResult<NameEntry> {
        match self.detect().await? {
            Detected::NmControl => self.nmcontrol.name_show(name).await,
            Detected::CoinRpc => self.rpc.name_show(name).await,
        }
    }

    async fn block_time(&self, height: u64) -> BackendResult<Option<i64>> {
        match self.detect().await? {
            Detected::NmControl => self.nmcontrol.block_time(height).await,
            Detected::CoinRpc => self.rpc.block_time(height).await,
        }
    }
}
