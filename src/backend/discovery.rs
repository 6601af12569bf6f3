/// Namecoin node discovery
///
/// namecoind keeps `namecoin.conf` and the RPC `.cookie` in its data
/// directory. Credentials and the RPC port are read from there unless the
/// environment overrides them.
use crate::error::{KeyserverError, KeyserverResult};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_RPC_PORT: u16 = 8336;
pub const DEFAULT_NMCONTROL_PORT: u16 = 9000;
pub const CONF_FILE: &str = "namecoin.conf";
pub const COOKIE_FILE: &str = ".cookie";

/// Platform default data directory of namecoind
pub fn default_datadir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join("Namecoin"))
    } else {
        let home = PathBuf::from(std::env::var_os("HOME")?);
        if cfg!(target_os = "macos") {
            Some(home.join("Library").join("Application Support").join("Namecoin"))
        } else {
            Some(home.join(".namecoin"))
        }
    }
}

/// RPC settings found in `namecoin.conf`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeConf {
    pub rpcuser: Option<String>,
    pub rpcpassword: Option<String>,
    pub rpcport: Option<u16>,
    pub rpcconnect: Option<String>,
}

impl NodeConf {
    /// Parse `key=value` lines. Comments and unrelated keys are skipped.
    pub fn parse(contents: &str) -> KeyserverResult<Self> {
        let mut conf = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();

            match key.trim() {
                "rpcuser" => conf.rpcuser = Some(value),
                "rpcpassword" => conf.rpcpassword = Some(value),
                "rpcconnect" => conf.rpcconnect = Some(value),
                "rpcport" => {
                    let port = value.parse().map_err(|_| {
                        KeyserverError::Internal(format!("Invalid rpcport in {}: '{}'", CONF_FILE, value))
                    })?;
                    conf.rpcport = Some(port);
                }
                _ => {}
            }
        }

        Ok(conf)
    }

    /// Read `<datadir>/namecoin.conf`; a missing file means no settings
    pub fn load(datadir: &Path) -> KeyserverResult<Self> {
        let path = datadir.join(CONF_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Reading node settings from {}", path.display());
                Self::parse(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} in {}", CONF_FILE, datadir.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// RPC endpoint implied by `rpcconnect` and `rpcport`
    pub fn rpc_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.rpcconnect.as_deref().unwrap_or("127.0.0.1"),
            self.rpcport.unwrap_or(DEFAULT_RPC_PORT)
        )
    }
}
