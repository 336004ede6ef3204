//! API route definitions
//!
//! - /api/v1/sessions, /api/v1/session - session bootstrap and state
//! - /api/v1/auth/* - registration, login, logout
//! - /api/v1/machines - catalog
//! - /api/v1/inspections/* - evaluate, save, read back, report download
//! - /api/v1/chat/* - QA assistant

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all versioned API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/session", get(handlers::get_session))
        // Accounts
        .route("/auth/register/begin", post(handlers::begin_registration))
        .route("/auth/register/cancel", post(handlers::cancel_registration))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        // Inspections
        .route("/machines", get(handlers::list_machines))
        .route("/inspections/evaluate", post(handlers::evaluate_form))
        .route(
            "/inspections",
            post(handlers::submit_inspection).get(handlers::list_inspections),
        )
        .route("/inspections/:id", get(handlers::get_inspection))
        .route("/inspections/:id/report", get(handlers::get_report))
        // Chat
        .route("/chat", post(handlers::post_chat))
        .route("/chat/history", get(handlers::get_chat_history))
        .with_state(state)
}

/// Legacy health endpoint at root level
pub fn legacy_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
