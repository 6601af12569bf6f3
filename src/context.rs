/// Application context and dependency injection
use crate::{
    backend::{self, NameBackend},
    config::ServerConfig,
    error::KeyserverResult,
    identity::{FingerprintCache, IdentityRecordResolver},
    keys::KeyMaterialFetcher,
    lookup::{LookupRouter, ProxyFallback},
    upstream::Upstream,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<FingerprintCache>,
    pub lookup: Arc<LookupRouter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> KeyserverResult<Self> {
        config.validate()?;
        let backend = backend::from_config(&config)?;
        Self::with_backend(config, backend)
    }

    /// Create a context around an already constructed naming backend
    pub fn with_backend(
        config: ServerConfig,
        backend: Arc<dyn NameBackend>,
    ) -> KeyserverResult<Self> {
        let upstream = Arc::new(Upstream::new(&config.upstream)?);

        let cache = Arc::new(FingerprintCache::new(
            config.cache.max_entries,
            config.cache_ttl(),
        ));

        let lookup = LookupRouter::new(
            cache.clone(),
            IdentityRecordResolver::new(backend),
            KeyMaterialFetcher::new(upstream.clone()),
            ProxyFallback::new(upstream),
        )
        .with_index_timestamps(config.index.timestamps);

        tracing::info!(
            "Keyserver context ready: upstream {}, cache {} entries / {} min",
            config.upstream.host,
            config.cache.max_entries,
            config.cache.ttl_minutes
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            lookup: Arc::new(lookup),
        })
    }
}
