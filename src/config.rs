/// Configuration management for the keyserver gateway
use crate::{
    backend::discovery::{self, NodeConf, COOKIE_FILE, DEFAULT_NMCONTROL_PORT},
    error::{KeyserverError, KeyserverResult},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

/// Listen address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

/// Standard keyserver used for key fetches and proxying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Host (and optional port) of the standard keyserver
    pub host: String,
    /// Always "https" in production; tests point this at plain http
    pub scheme: String,
    /// Timeout for every outbound call, in seconds
    pub timeout_secs: u64,
}

/// Fingerprint cache bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_minutes: u64,
    /// Interval of the background sweep job
    pub sweep_interval_secs: u64,
}

/// Index output options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Append the record's block time to the pub line
    pub timestamps: bool,
}

/// Naming backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// namecoind JSON-RPC over HTTP
    Rpc(RpcConfig),
    /// NMControl JSON over a raw TCP socket
    NmControl(NmControlConfig),
    /// Try NMControl first, then namecoind
    Auto {
        nmcontrol: NmControlConfig,
        rpc: RpcConfig,
    },
    /// Static JSON file of names, for running without a node
    File { path: PathBuf },
}

/// namecoind connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Used only when user or password is missing
    pub cookie_file: Option<PathBuf>,
}

/// NMControl connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmControlConfig {
    pub host: String,
    pub port: u16,
}

impl RpcConfig {
    /// Merge explicit settings with what the node's data directory holds
    ///
    /// Explicit values win over `namecoin.conf`; the cookie in the data
    /// directory is the last resort for credentials.
    pub fn discover(
        datadir: Option<&Path>,
        url: Option<String>,
        user: Option<String>,
        password: Option<String>,
        cookie_file: Option<PathBuf>,
    ) -> KeyserverResult<Self> {
        let conf = match datadir {
            Some(dir) => NodeConf::load(dir)?,
            None => NodeConf::default(),
        };

        Ok(Self {
            url: url.unwrap_or_else(|| conf.rpc_url()),
            user: user.or(conf.rpcuser),
            password: password.or(conf.rpcpassword),
            cookie_file: cookie_file.or_else(|| datadir.map(|dir| dir.join(COOKIE_FILE))),
        })
    }

    fn from_env(datadir: Option<&Path>) -> KeyserverResult<Self> {
        Self::discover(
            datadir,
            env::var("NMC_RPC_URL").ok(),
            env::var("NMC_RPC_USER").ok(),
            env::var("NMC_RPC_PASSWORD").ok(),
            env::var_os("NMC_RPC_COOKIE_FILE").map(PathBuf::from),
        )
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: NodeConf::default().rpc_url(),
            user: None,
            password: None,
            cookie_file: discovery::default_datadir().map(|dir| dir.join(COOKIE_FILE)),
        }
    }
}

impl NmControlConfig {
    fn from_env() -> KeyserverResult<Self> {
        Ok(Self {
            host: env::var("NMCONTROL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("NMCONTROL_PORT", DEFAULT_NMCONTROL_PORT)?,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                host: "127.0.0.1".to_string(),
                port: 8083,
            },
            upstream: UpstreamConfig {
                host: "keys.openpgp.org".to_string(),
                scheme: "https".to_string(),
                timeout_secs: 10,
            },
            cache: CacheConfig {
                max_entries: 10,
                ttl_minutes: 5,
                sweep_interval_secs: 60,
            },
            index: IndexConfig::default(),
            backend: BackendConfig::Rpc(RpcConfig::default()),
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> KeyserverResult<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let host = env::var("KEYSERVER_HOST").unwrap_or(defaults.service.host);
        let port = parse_var("KEYSERVER_PORT", defaults.service.port)?;

        let upstream_host = env::var("KEYSERVER_UPSTREAM").unwrap_or(defaults.upstream.host);
        let upstream_scheme =
            env::var("KEYSERVER_UPSTREAM_SCHEME").unwrap_or(defaults.upstream.scheme);
        let timeout_secs =
            parse_var("KEYSERVER_HTTP_TIMEOUT_SECS", defaults.upstream.timeout_secs)?;

        let max_entries = parse_var("KEYSERVER_CACHE_MAX_ENTRIES", defaults.cache.max_entries)?;
        let ttl_minutes = parse_var("KEYSERVER_CACHE_TTL_MINUTES", defaults.cache.ttl_minutes)?;
        let sweep_interval_secs =
            parse_var("KEYSERVER_CACHE_SWEEP_SECS", defaults.cache.sweep_interval_secs)?;

        let timestamps = parse_flag("KEYSERVER_INDEX_TIMESTAMPS", false)?;

        let datadir = env::var_os("NMC_DATADIR")
            .map(PathBuf::from)
            .or_else(discovery::default_datadir);

        let backend = match env::var("KEYSERVER_BACKEND")
            .unwrap_or_else(|_| "rpc".to_string())
            .to_lowercase()
            .as_str()
        {
            "rpc" => BackendConfig::Rpc(RpcConfig::from_env(datadir.as_deref())?),
            "nmcontrol" => BackendConfig::NmControl(NmControlConfig::from_env()?),
            "auto" => BackendConfig::Auto {
                nmcontrol: NmControlConfig::from_env()?,
                rpc: RpcConfig::from_env(datadir.as_deref())?,
            },
            "file" => BackendConfig::File {
                path: env::var("KEYSERVER_NAMES_FILE")
                    .map(PathBuf::from)
                    .map_err(|_| {
                        KeyserverError::Internal(
                            "KEYSERVER_NAMES_FILE is required for the file backend".to_string(),
                        )
                    })?,
            },
            other => {
                return Err(KeyserverError::Internal(format!(
                    "Unknown backend '{}', expected 'rpc', 'nmcontrol', 'auto' or 'file'",
                    other
                )))
            }
        };

        let level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);
        let json = env::var("KEYSERVER_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig { host, port },
            upstream: UpstreamConfig {
                host: upstream_host,
                scheme: upstream_scheme,
                timeout_secs,
            },
            cache: CacheConfig {
                max_entries,
                ttl_minutes,
                sweep_interval_secs,
            },
            index: IndexConfig { timestamps },
            backend,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> KeyserverResult<()> {
        if self.upstream.host.is_empty() {
            return Err(KeyserverError::Internal(
                "Upstream keyserver host cannot be empty".to_string(),
            ));
        }

        if self.upstream.scheme != "https" && self.upstream.scheme != "http" {
            return Err(KeyserverError::Internal(format!(
                "Unsupported upstream scheme: {}",
                self.upstream.scheme
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(KeyserverError::Internal(
                "HTTP timeout must be at least one second".to_string(),
            ));
        }

        if self.cache.max_entries == 0 || self.cache.ttl_minutes == 0 {
            return Err(KeyserverError::Internal(
                "Cache size and TTL must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_minutes * 60)
    }
}

/// Read a typed variable; unset means `default`, unparseable is an error
fn parse_var<T: FromStr>(name: &str, default: T) -> KeyserverResult<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            KeyserverError::Internal(format!("Invalid value for {}: '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &str, default: bool) -> KeyserverResult<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(KeyserverError::Internal(format!(
                "Invalid value for {}: '{}'",
                name, raw
            ))),
        },
        Err(_) => Ok(default),
    }
}
