//! Inspection form endpoints: evaluate, save, read back, report download

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::api::session_auth::SessionAuth;
use crate::evaluator::{Classification, Evaluation};
use crate::report::report_file_name;
use crate::service::ServiceError;
use crate::types::{InspectionStatus, Shift};

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub machine_id: i64,
    pub shift: Shift,
    pub values: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct EvaluatedLine {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
    pub classification: Classification,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub machine_id: i64,
    pub machine_name: String,
    pub shift: Shift,
    pub status: InspectionStatus,
    pub lines: Vec<EvaluatedLine>,
}

impl EvaluationResponse {
    fn new(evaluation: Evaluation, shift: Shift) -> Self {
        Self {
            machine_id: evaluation.machine_id,
            machine_name: evaluation.machine_name,
            shift,
            status: evaluation.status,
            lines: evaluation
                .lines
                .into_iter()
                .map(|l| EvaluatedLine {
                    name: l.measurement.name().to_string(),
                    min: l.measurement.min(),
                    max: l.measurement.max(),
                    value: l.measurement.value,
                    classification: l.classification,
                    color: l.classification.color_name(),
                })
                .collect(),
        }
    }
}

/// POST /api/v1/inspections/evaluate - Classify the form and keep it pending
pub async fn evaluate_form(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Json(req): Json<EvaluateRequest>,
) -> Result<Response, ServiceError> {
    let mut ctx = auth.session.lock().await;
    let evaluation = state
        .service
        .evaluate_form(&mut ctx, req.machine_id, req.shift, &req.values)
        .await?;
    Ok(ApiResponse::ok(EvaluationResponse::new(evaluation, req.shift)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub reaction: Option<String>,
}

/// An empty body means "no reaction"; anything else must be a valid
/// `SubmitRequest` document.
fn parse_submit_body(body: &[u8]) -> Result<SubmitRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SubmitRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid request body: {e}"))
}

/// POST /api/v1/inspections - Save the pending form
pub async fn submit_inspection(
    State(state): State<ApiState>,
    auth: SessionAuth,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let req = match parse_submit_body(&body) {
        Ok(req) => req,
        Err(msg) => return Ok(ApiErrorResponse::bad_request(msg)),
    };
    let mut ctx = auth.session.lock().await;
    let saved = state
        .service
        .submit_inspection(&mut ctx, req.reaction.as_deref())
        .await?;
    Ok(ApiResponse::created(saved))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /api/v1/inspections?limit=N - The caller's recent inspections
pub async fn list_inspections(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response, ServiceError> {
    let ctx = auth.session.lock().await;
    let inspections = state
        .service
        .recent_inspections(&ctx, query.limit.unwrap_or(20))
        .await?;
    Ok(ApiResponse::ok(inspections))
}

/// GET /api/v1/inspections/:id
pub async fn get_inspection(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    let ctx = auth.session.lock().await;
    let detail = state.service.get_inspection(&ctx, id).await?;
    Ok(ApiResponse::ok(detail))
}

/// GET /api/v1/inspections/:id/report - PDF download
pub async fn get_report(
    State(state): State<ApiState>,
    auth: SessionAuth,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    let ctx = auth.session.lock().await;
    let bytes = state.service.report_pdf(&ctx, id).await?;
    let disposition = format!("attachment; filename=\"{}\"", report_file_name(id));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_body() {
        assert!(parse_submit_body(b"").unwrap().reaction.is_none());
        assert!(parse_submit_body(b"  \n").unwrap().reaction.is_none());
        assert!(parse_submit_body(b"{}").unwrap().reaction.is_none());
        assert_eq!(
            parse_submit_body(br#"{"reaction":"Replaced pump"}"#).unwrap().reaction.as_deref(),
            Some("Replaced pump")
        );
        assert!(parse_submit_body(br#"{"reaction":5}"#).is_err());
        assert!(parse_submit_body(b"Replaced pump").is_err());
    }
}
