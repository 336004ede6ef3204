//! QA chat endpoints

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::envelope::ApiResponse;
use crate::api::session_auth::SessionAuth;
use crate::service::ServiceError;
use crate::session::ChatEntry;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /api/v1/chat
pub async fn post_chat(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    let reply = state.service.chat(&mut ctx, &req.message).await?;
    Ok(ApiResponse::ok(ChatResponse { reply }))
}

/// GET /api/v1/chat/history - Transcript, oldest first
pub async fn get_chat_history(
    State(state): State<ApiState>,
    auth: SessionAuth,
) -> Result<Response, ServiceError> {
    let ctx = auth.session.lock().await;
    let history: Vec<ChatEntry> = state.service.chat_history(&ctx)?;
    Ok(ApiResponse::ok(history))
}
