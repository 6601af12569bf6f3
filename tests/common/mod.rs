//! Shared fixtures: a running gateway backed by an in-memory naming backend,
//! and a stand-in for the standard keyserver. Mirrors `src/test_support.rs`,
//! which unit tests use; keep the two in sync.
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::get,
    Router,
};
use nmc_keyserver::{
    backend::MemoryBackend, config::ServerConfig, identity::Fingerprint, server::build_router,
    AppContext,
};
use parking_lot::RwLock;
use sequoia_openpgp::{cert::CertBuilder, serialize::SerializeInto};
use serde::Deserialize;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};

pub struct TestKey {
    pub fingerprint: Fingerprint,
    pub armored: Vec<u8>,
    pub binary: Vec<u8>,
}

pub fn generate_key(userid: &str) -> TestKey {
    let (cert, _) = CertBuilder::new()
        .add_userid(userid)
        .add_signing_subkey()
        .generate()
        .unwrap();
    let fingerprint = Fingerprint::parse(&cert.fingerprint().to_hex()).unwrap();
    let armored = cert.armored().to_vec().unwrap();
    let binary = cert.to_vec().unwrap();
    TestKey {
        fingerprint,
        armored,
        binary,
    }
}

#[derive(Default)]
pub struct Keyserver {
    lookups: RwLock<HashMap<(String, String), Vec<u8>>>,
    files: RwLock<HashMap<String, Vec<u8>>>,
    pub requests: RwLock<Vec<String>>,
}

impl Keyserver {
    pub fn add_key(&self, key: &TestKey) {
        self.add_lookup("get", &key.fingerprint.prefixed(), &key.armored);
    }

    pub fn add_lookup(&self, op: &str, search: &str, body: &[u8]) {
        self.lookups
            .write()
            .insert((op.to_string(), search.to_lowercase()), body.to_vec());
    }

    pub fn add_file(&self, path: &str, body: &[u8]) {
        self.files.write().insert(path.to_string(), body.to_vec());
    }
}

#[derive(Deserialize)]
struct Params {
    #[serde(default)]
    op: String,
    #[serde(default)]
    search: String,
}

async fn lookup(
    State(ks): State<Arc<Keyserver>>,
    uri: Uri,
    Query(params): Query<Params>,
) -> Result<Vec<u8>, StatusCode> {
    ks.requests.write().push(uri.to_string());
    ks.lookups
        .read()
        .get(&(params.op, params.search.to_lowercase()))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn file(
    State(ks): State<Arc<Keyserver>>,
    uri: Uri,
    Path(path): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    ks.requests.write().push(uri.to_string());
    ks.files.read().get(&path).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Gateway and keyserver running on loopback ports
pub struct TestEnv {
    pub gateway: SocketAddr,
    pub keyserver_addr: SocketAddr,
    pub keyserver: Arc<Keyserver>,
    pub backend: Arc<MemoryBackend>,
    pub ctx: AppContext,
    pub http: reqwest::Client,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let keyserver = Arc::new(Keyserver::default());
        let keyserver_addr = spawn(
            Router::new()
                .route("/pks/lookup", get(lookup))
                .route("/files/*path", get(file))
                .with_state(keyserver.clone()),
        )
        .await;

        let mut config = ServerConfig::default();
        config.upstream.host = keyserver_addr.to_string();
        config.upstream.scheme = "http".to_string();
        config.upstream.timeout_secs = 5;
        configure(&mut config);

        let backend = Arc::new(MemoryBackend::new());
        let ctx = AppContext::with_backend(config, backend.clone()).unwrap();
        let gateway = spawn(build_router(ctx.clone())).await;

        Self {
            gateway,
            keyserver_addr,
            keyserver,
            backend,
            ctx,
            http: reqwest::Client::new(),
        }
    }

    pub fn file_url(&self, path: &str) -> String {
        format!("http://{}/files/{}", self.keyserver_addr, path)
    }

    /// GET a path on the gateway, returning status and body
    pub async fn get(&self, path_and_query: &str) -> (reqwest::StatusCode, Vec<u8>) {
        let response = self
            .http
            .get(format!("http://{}{}", self.gateway, path_and_query))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.bytes().await.unwrap().to_vec())
    }

    pub fn upstream_requests(&self) -> Vec<String> {
        self.keyserver.requests.read().clone()
    }
}
