/// Shared fixtures for unit tests: throwaway OpenPGP keys and an in-process
/// HKP keyserver that also serves owner-hosted key files.
use crate::{config::UpstreamConfig, identity::Fingerprint, upstream::Upstream};
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::get,
    Router,
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
    let (cert, _revocation) = CertBuilder::new()
        .add_userid(userid)
        .add_signing_subkey()
        .generate()
        .expect("generate cert");
    let fingerprint = Fingerprint::parse(&cert.fingerprint().to_hex()).expect("fingerprint");
    let armored = cert.armored().to_vec().expect("armor");
    let binary = cert.to_vec().expect("serialize");
    TestKey {
        fingerprint,
        armored,
        binary,
    }
}

#[derive(Default)]
struct FakeState {
    /// (op, lowercase search) -> body
    lookups: RwLock<HashMap<(String, String), Vec<u8>>>,
    files: RwLock<HashMap<String, Vec<u8>>>,
    requests: RwLock<Vec<String>>,
}

#[derive(Deserialize)]
struct LookupParams {
    #[serde(default)]
    op: String,
    #[serde(default)]
    search: String,
}

/// Minimal keyserver answering /pks/lookup from a table
pub struct FakeKeyserver {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeKeyserver {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/pks/lookup", get(lookup))
            .route("/files/*path", get(file))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn upstream(&self) -> Arc<Upstream> {
        Arc::new(
            Upstream::new(&UpstreamConfig {
                host: self.host(),
                scheme: "http".to_string(),
                timeout_secs: 5,
            })
            .unwrap(),
        )
    }

    pub fn add_key(&self, fingerprint: &Fingerprint, armored: &[u8]) {
        self.add_lookup("get", &fingerprint.prefixed(), armored);
    }

    pub fn add_lookup(&self, op: &str, search: &str, body: &[u8]) {
        self.state
            .lookups
            .write()
            .insert((op.to_string(), search.to_lowercase()), body.to_vec());
    }

    /// Serve `body` at /files/<path> and return its URL
    pub fn host_file(&self, path: &str, body: &[u8]) -> String {
        self.state.files.write().insert(path.to_string(), body.to_vec());
        format!("http://{}/files/{}", self.addr, path)
    }

    /// Path and query of every request received so far
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.read().clone()
    }
}

async fn lookup(
    State(state): State<Arc<FakeState>>,
    uri: Uri,
    Query(params): Query<LookupParams>,
) -> Result<Vec<u8>, StatusCode> {
    state.requests.write().push(uri.to_string());
    state
        .lookups
        .read()
        .get(&(params.op, params.search.to_lowercase()))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn file(
    State(state): State<Arc<FakeState>>,
    uri: Uri,
    Path(path): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    state.requests.write().push(uri.to_string());
    state
        .files
        .read()
        .get(&path)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}
