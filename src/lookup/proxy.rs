/// Forwarding of search terms the gateway does not own
use crate::{
    error::{KeyserverError, KeyserverResult},
    lookup::LookupRequest,
    upstream::{FetchError, Upstream},
};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ProxyFallback {
    upstream: Arc<Upstream>,
}

impl ProxyFallback {
    pub fn new(upstream: Arc<Upstream>) -> Self {
        Self { upstream }
    }

    /// Path and query sent upstream for a request
    ///
    /// The inbound path and query are kept verbatim when known; otherwise a
    /// machine-readable lookup is built from the search term and operation.
    pub fn upstream_path(request: &LookupRequest) -> String {
        match &request.path_and_query {
            Some(path_and_query) => path_and_query.clone(),
            None => format!(
                "/pks/lookup?op={}&options=mr&search={}",
                urlencoding::encode(&request.op),
                urlencoding::encode(&request.search)
            ),
        }
    }

    /// Relay a request to the standard keyserver and return its body untouched
    pub async fn forward(&self, request: &LookupRequest) -> KeyserverResult<Vec<u8>> {
        let url = self.upstream.url_for(&Self::upstream_path(request));
        debug!("Proxying '{}' to {}", request.search, url);

        self.upstream.get(&url).await.map_err(|e| match e {
            FetchError::Status(StatusCode::NOT_FOUND) => {
                KeyserverError::NotFound(format!("No results for '{}'", request.search))
            }
            other => KeyserverError::UpstreamFetch(format!("{}: {}", url, other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeKeyserver;

    fn request(search: &str, op: &str, path: Option<&str>) -> LookupRequest {
        LookupRequest {
            search: search.to_string(),
            op: op.to_string(),
            path_and_query: path.map(str::to_string),
        }
    }

    #[test]
    fn test_synthesized_path_encodes_search() {
        let req = request("someone else@example.com", "index", None);
        assert_eq!(
            ProxyFallback::upstream_path(&req),
            "/pks/lookup?op=index&options=mr&search=someone%20else%40example.com"
        );
    }

    #[tokio::test]
    async fn test_forward_preserves_path_and_query() {
        let server = FakeKeyserver::start().await;
        server.add_lookup("index", "someone-else@example.com", b"info:1:0\n");
        let proxy = ProxyFallback::new(server.upstream());

        let path = "/pks/lookup?search=someone-else@example.com&op=index&fingerprint=on";
        let body = proxy
            .forward(&request("someone-else@example.com", "index", Some(path)))
            .await
            .unwrap();

        assert_eq!(body, b"info:1:0\n");
        assert_eq!(server.requests(), vec![path.to_string()]);
    }

    #[tokio::test]
    async fn test_upstream_not_found() {
        let server = FakeKeyserver::start().await;
        let proxy = ProxyFallback::new(server.upstream());

        let err = proxy
            .forward(&request("nobody@example.com", "index", None))
            .await
            .unwrap_err();
        assert!(matches!(err, KeyserverError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upstream_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = Upstream::new(&crate::config::UpstreamConfig {
            host: addr.to_string(),
            scheme: "http".to_string(),
            timeout_secs: 2,
        })
        .unwrap();
        let proxy = ProxyFallback::new(Arc::new(upstream));

        let err = proxy
            .forward(&request("nobody@example.com", "index", None))
            .await
            .unwrap_err();
        assert!(matches!(err, KeyserverError::UpstreamFetch(_)));
    }
}
