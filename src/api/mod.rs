//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /caches/:cache/:key` - Store a value
//! - `POST /caches/:cache/:key` - Store a value if absent
//! - `GET /caches/:cache/:key` - Read a value
//! - `DELETE /caches/:cache/:key` - Evict a key
//! - `DELETE /caches/:cache` - Clear a cache
//! - `GET /caches` - List cache names
//! - `GET /caches/:cache/stats` - Per-cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
