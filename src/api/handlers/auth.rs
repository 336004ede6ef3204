//! Session bootstrap and account endpoints

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::envelope::ApiResponse;
use crate::api::session_auth::SessionAuth;
use crate::service::ServiceError;
use crate::session::SessionState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Session state as returned to the client.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub state: SessionState,
}

/// POST /api/v1/sessions - Start a logged-out session
pub async fn create_session(State(state): State<ApiState>) -> Response {
    let (token, session) = state.sessions.create().await;
    let current = session.lock().await.state().clone();
    ApiResponse::created(SessionView {
        token: Some(token),
        state: current,
    })
}

/// GET /api/v1/session - Current state of the caller's session
pub async fn get_session(auth: SessionAuth) -> Response {
    let ctx = auth.session.lock().await;
    ApiResponse::ok(SessionView {
        token: None,
        state: ctx.state().clone(),
    })
}

/// POST /api/v1/auth/register/begin - Switch to the registration screen
pub async fn begin_registration(auth: SessionAuth) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    ctx.begin_registration()?;
    Ok(ApiResponse::ok(SessionView {
        token: None,
        state: ctx.state().clone(),
    }))
}

/// POST /api/v1/auth/register/cancel - Back to the login screen
pub async fn cancel_registration(auth: SessionAuth) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    ctx.cancel_registration()?;
    Ok(ApiResponse::ok(SessionView {
        token: None,
        state: ctx.state().clone(),
    }))
}

/// POST /api/v1/auth/register - Create an account and log it in
pub async fn register(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    state.service.register(&mut ctx, &req.username, &req.password).await?;
    Ok(ApiResponse::created(SessionView {
        token: None,
        state: ctx.state().clone(),
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    state.service.login(&mut ctx, &req.username, &req.password).await?;
    Ok(ApiResponse::ok(SessionView {
        token: None,
        state: ctx.state().clone(),
    }))
}

/// POST /api/v1/auth/logout - Clears the pending form and chat history
pub async fn logout(State(state): State<ApiState>, auth: SessionAuth) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    state.service.logout(&mut ctx)?;
    Ok(ApiResponse::ok(SessionView {
        token: None,
        state: ctx.state().clone(),
    }))
}
