/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{KeyserverError, KeyserverResult},
};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    // HKP clients in browsers issue cross-origin lookups
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// 404 handler
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not found",
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> KeyserverResult<()> {
    let addr = ctx.config.listen_addr();

    info!("nmc-keyserver listening on {}", addr);
    info!("   Upstream keyserver: {}", ctx.config.upstream.host);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KeyserverError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| KeyserverError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
