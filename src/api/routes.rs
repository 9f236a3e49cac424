//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, names_handler,
    put_handler, put_if_absent_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /caches/:cache/:key` - Store a value
/// - `POST /caches/:cache/:key` - Store a value if the key is absent
/// - `GET /caches/:cache/:key` - Read a value
/// - `DELETE /caches/:cache/:key` - Evict a key
/// - `DELETE /caches/:cache` - Clear a cache
/// - `GET /caches` - List cache names
/// - `GET /caches/:cache/stats` - Per-cache statistics
/// - `GET /health` - Health check endpoint
///
/// The static `stats` segment takes precedence, so a key literally named
/// `stats` cannot be addressed over HTTP.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/caches", get(names_handler))
        .route("/caches/:cache", delete(clear_handler))
        .route("/caches/:cache/stats", get(stats_handler))
        .route(
            "/caches/:cache/:key",
            put(put_handler)
                .post(put_if_absent_handler)
                .get(get_handler)
                .delete(delete_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
