pub mod auth;
pub mod enrich;
pub mod error;
pub mod links;
pub mod middleware;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tracing::error;

use stash_db::StoreError;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// All `/api` routes. Link routes sit behind the token gate.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/links", get(links::list_links).post(links::create_link))
        .route("/api/links/tags", get(links::list_tags))
        .route("/api/links/reorder", put(links::reorder_links))
        .route("/api/links/{id}", delete(links::delete_link))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Run a store operation off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
