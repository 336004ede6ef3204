//! REST API module using Axum
//!
//! JSON endpoints that drive the inspection workflow. A client first opens
//! a session (`POST /api/v1/sessions`) and then sends the returned token as
//! `Authorization: Bearer <token>` on every call.

pub mod envelope;
mod error;
pub mod handlers;
mod routes;
pub mod session_auth;

pub use handlers::ApiState;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::{defaults, ServerConfig};

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// `server.cors_origins` lists origins allowed for development (e.g.
/// `http://localhost:5173`).
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return base;
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "CORS: ignoring unparsable origin");
                None
            }
        })
        .collect();
    tracing::info!(origins = ?origins, "CORS: allowing configured origins");
    base.allow_origin(allowed)
}

/// Create the complete application router.
pub fn create_app(state: ApiState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::legacy_routes(state))
        // Middleware
        .layer(RequestBodyLimitLayer::new(defaults::MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&server.cors_origins))
}
