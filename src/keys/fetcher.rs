/// Key Material Fetcher - custom URI first, then the standard keyserver
use crate::{
    error::{KeyserverError, KeyserverResult},
    identity::{Fingerprint, IdentityRecord},
    keys::{KeyMaterial, KeySource},
    upstream::Upstream,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct KeyMaterialFetcher {
    upstream: Arc<Upstream>,
}

impl KeyMaterialFetcher {
    pub fn new(upstream: Arc<Upstream>) -> Self {
        Self { upstream }
    }

    /// Fetch the public key for a resolved record and check its fingerprint
    ///
    /// Any failure of the custom URI, unusable or wrong key material
    /// included, falls through to the standard keyserver. Whatever is
    /// returned must match `fingerprint` exactly.
    pub async fn fetch(
        &self,
        record: &IdentityRecord,
        fingerprint: &Fingerprint,
    ) -> KeyserverResult<KeyMaterial> {
        if let Some(uri) = record.custom_key_uri() {
            match self.from_custom_uri(uri, fingerprint).await {
                Ok(material) => {
                    debug!("Fetched key for {} from custom uri {}", record.name, uri);
                    return Ok(material);
                }
                Err(reason) => warn!(
                    "Custom key uri {} for {} failed ({}), trying {}",
                    uri,
                    record.name,
                    reason,
                    self.upstream.host()
                ),
            }
        }

        let material = self.from_keyserver(fingerprint).await?;
        material.verify(fingerprint)?;
        Ok(material)
    }

    async fn from_custom_uri(
        &self,
        uri: &str,
        fingerprint: &Fingerprint,
    ) -> Result<KeyMaterial, String> {
        let bytes = self.upstream.get(uri).await.map_err(|e| e.to_string())?;
        let material = KeyMaterial::new(bytes, KeySource::CustomUri(uri.to_string()));
        material.verify(fingerprint).map_err(|e| e.to_string())?;
        Ok(material)
    }

    async fn from_keyserver(&self, fingerprint: &Fingerprint) -> KeyserverResult<KeyMaterial> {
        let url = self.upstream.key_url(fingerprint);
        let bytes = self.upstream.get(&url).await.map_err(|e| {
            KeyserverError::UpstreamFetch(format!("{} from {}: {}", fingerprint, url, e))
        })?;
        debug!("Fetched {} from {}", fingerprint, self.upstream.host());
        Ok(KeyMaterial::new(bytes, KeySource::Keyserver(url)))
    }
}
