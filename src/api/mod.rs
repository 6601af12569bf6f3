/// API routes and handlers
pub mod lookup;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(lookup::routes())
}
