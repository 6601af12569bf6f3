/// HKP endpoints
/// Implements /pks/lookup on top of the lookup router; /pks/add is refused
use crate::{
    context::AppContext,
    error::{KeyserverError, KeyserverResult},
    lookup::LookupRequest,
};
use axum::{
    extract::{Query, State},
    http::{header, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

/// /pks/lookup query parameters
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub op: String,
    /// HKP options such as `mr`; forwarded untouched when proxying
    #[serde(default)]
    pub options: Option<String>,
}

pub async fn lookup(
    State(ctx): State<AppContext>,
    uri: Uri,
    Query(params): Query<LookupParams>,
) -> KeyserverResult<impl IntoResponse> {
    debug!(
        search = %params.search,
        op = %params.op,
        options = ?params.options,
        "pks lookup"
    );

    let mut request = LookupRequest::new(params.search, params.op);
    if let Some(path_and_query) = uri.path_and_query() {
        request = request.with_path_and_query(path_and_query.as_str());
    }

    let body = ctx.lookup.lookup(&request).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

/// Key submission is not supported; identities publish keys on-chain
pub async fn add() -> KeyserverResult<()> {
    Err(KeyserverError::UnsupportedOperation(
        "Key submission is not supported".to_string(),
    ))
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/pks/lookup", get(lookup).post(lookup))
        .route("/pks/add", get(add).post(add))
}
