/// HTTP access to the standard keyserver and to owner-hosted key URLs
use crate::{
    config::UpstreamConfig,
    error::{KeyserverError, KeyserverResult},
    identity::Fingerprint,
};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why an outbound GET produced no usable body
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("{0}")]
    Transport(String),

    #[error("empty response body")]
    Empty,
}

/// The configured standard keyserver plus a shared HTTP client
pub struct Upstream {
    scheme: String,
    host: String,
    http_client: reqwest::Client,
}

impl Upstream {
    pub fn new(config: &UpstreamConfig) -> KeyserverResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("nmc-keyserver/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KeyserverError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            scheme: config.scheme.clone(),
            host: config.host.clone(),
            http_client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Absolute URL on the standard keyserver for a path plus query
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path_and_query)
    }

    /// Machine-readable get by fingerprint
    pub fn key_url(&self, fingerprint: &Fingerprint) -> String {
        self.url_for(&format!(
            "/pks/lookup?op=get&options=mr&search={}",
            fingerprint.prefixed()
        ))
    }

    /// GET an http(s) URL and return the body
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        debug!("GET {}", parsed);
        let response = self
            .http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if body.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> Upstream {
        Upstream::new(&UpstreamConfig {
            host: "keys.example.org".to_string(),
            scheme: "https".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_key_url() {
        let fpr = Fingerprint::parse("FC819E25D6AC1119F748479DCBF940B772132E18").unwrap();
        assert_eq!(
            upstream().key_url(&fpr),
            "https://keys.example.org/pks/lookup?op=get&options=mr&search=0xfc819e25d6ac1119f748479dcbf940b772132e18"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_http_schemes() {
        let result = upstream().get("file:///etc/passwd").await;
        assert!(matches!(result, Err(FetchError::UnsupportedScheme(_))));

        let result = upstream().get("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
