/// Lookup Router
///
/// Bridges HKP search terms onto id/ names. A term is either an identity
/// name, a fingerprint this gateway recently handed out in an index answer,
/// or something else entirely, which is relayed to the standard keyserver.
///
/// The cache is what lets a client run `op=index&search=id/foo` and then
/// `op=get&search=0x<fingerprint>`: the second request carries no name, so
/// the fingerprint is mapped back to the name it came from and the record is
/// resolved again to make sure it still points at the same key.

pub mod proxy;

pub use proxy::ProxyFallback;

use crate::{
    error::{KeyserverError, KeyserverResult},
    identity::{
        extract_fingerprint, Fingerprint, FingerprintCache, IdentityName, IdentityRecord,
        IdentityRecordResolver,
    },
    keys::{KeyMaterial, KeyMaterialFetcher, KeySource},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One HKP lookup as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub search: String,
    pub op: String,
    /// Inbound path and query, when the request came over HTTP
    pub path_and_query: Option<String>,
}

impl LookupRequest {
    pub fn new(search: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            op: op.into(),
            path_and_query: None,
        }
    }

    pub fn with_path_and_query(mut self, path_and_query: impl Into<String>) -> Self {
        self.path_and_query = Some(path_and_query.into());
        self
    }
}

/// What a search term refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchClass {
    ByName(IdentityName),
    ByCachedFingerprint {
        fingerprint: String,
        name: IdentityName,
    },
    Unrecognized,
}

pub struct LookupRouter {
    cache: Arc<FingerprintCache>,
    resolver: IdentityRecordResolver,
    fetcher: KeyMaterialFetcher,
    proxy: ProxyFallback,
    index_timestamps: bool,
}

impl LookupRouter {
    pub fn new(
        cache: Arc<FingerprintCache>,
        resolver: IdentityRecordResolver,
        fetcher: KeyMaterialFetcher,
        proxy: ProxyFallback,
    ) -> Self {
        Self {
            cache,
            resolver,
            fetcher,
            proxy,
            index_timestamps: false,
        }
    }

    /// Emit `pub:0x<fpr>:::<creationdate>::` lines
    pub fn with_index_timestamps(mut self, enabled: bool) -> Self {
        self.index_timestamps = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.cache
    }

    /// Decide where a search term goes
    pub fn classify(&self, search: &str) -> KeyserverResult<SearchClass> {
        if search.starts_with("id/") {
            return Ok(SearchClass::ByName(IdentityName::parse(search)?));
        }

        let key = cache_key(search);
        match self.cache.get(&key) {
            Some(name) => Ok(SearchClass::ByCachedFingerprint {
                fingerprint: key,
                name,
            }),
            None => Ok(SearchClass::Unrecognized),
        }
    }

    /// Answer one lookup with the response body
    pub async fn lookup(&self, request: &LookupRequest) -> KeyserverResult<Vec<u8>> {
        let (name, cached) = match self.classify(&request.search)? {
            SearchClass::ByName(name) => (name, None),
            SearchClass::ByCachedFingerprint { fingerprint, name } => {
                debug!("{} is cached for {}", fingerprint, name);
                (name, Some(fingerprint))
            }
            SearchClass::Unrecognized => return self.proxied(request).await,
        };

        let record = self.resolver.resolve(&name).await?;
        let fingerprint = extract_fingerprint(&record)?;

        if let Some(cached) = cached {
            if cached != fingerprint.prefixed() {
                warn!(
                    "Cached {} for {} no longer matches record ({})",
                    cached, name, fingerprint
                );
                self.cache.remove_by_name(&name);
                return Err(KeyserverError::StaleCache {
                    cached,
                    current: fingerprint.prefixed(),
                });
            }
        }

        self.cache.put(&fingerprint, &name);

        match request.op.as_str() {
            "index" => {
                let created = if self.index_timestamps {
                    Some(self.resolver.record_time(&record).await.unwrap_or(0))
                } else {
                    None
                };
                info!("index {} -> {}", name, fingerprint);
                Ok(format_index(&record, &fingerprint, created).into_bytes())
            }
            "get" => {
                let material = self.fetcher.fetch(&record, &fingerprint).await?;
                info!("get {} -> {} from {}", name, fingerprint, material.source);
                Ok(material.into_bytes())
            }
            other => Err(KeyserverError::UnsupportedOperation(format!(
                "op={} for {}",
                other, name
            ))),
        }
    }

    async fn proxied(&self, request: &LookupRequest) -> KeyserverResult<Vec<u8>> {
        let body = self.proxy.forward(request).await?;

        if request.op == "get" {
            if let Ok(expected) = Fingerprint::parse(&request.search) {
                let url = ProxyFallback::upstream_path(request);
                KeyMaterial::new(body.clone(), KeySource::Keyserver(url)).verify(&expected)?;
            }
        }

        Ok(body)
    }
}

/// Normalize a search term into the cache key form
fn cache_key(search: &str) -> String {
    let lower = search.trim().to_lowercase();
    if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("0x{}", lower)
    } else {
        lower
    }
}

/// Machine-readable index for a single identity
///
/// `created` adds the creation date column to the pub line.
pub fn format_index(
    record: &IdentityRecord,
    fingerprint: &Fingerprint,
    created: Option<i64>,
) -> String {
    let pub_line = match created {
        Some(time) => format!("pub:{}:::{}::", fingerprint.prefixed(), time),
        None => format!("pub:{}", fingerprint.prefixed()),
    };

    let mut uid = vec![record.name.to_string()];
    uid.extend(
        record
            .display_fields()
            .iter()
            .map(|field| urlencoding::encode(field).into_owned()),
    );

    format!("info:1:1\n{}\nuid:{}\n", pub_line, uid.join(" - "))
}
