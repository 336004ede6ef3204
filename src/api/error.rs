//! Mapping of workflow errors onto HTTP responses

use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use super::envelope::ApiErrorResponse;
use crate::auth::AuthError;
use crate::evaluator::EvaluationError;
use crate::service::ServiceError;
use crate::session::SessionError;
use crate::storage::StorageError;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Session(SessionError::NotLoggedIn) => ApiErrorResponse::unauthorized("Not logged in"),
            Self::Session(SessionError::UnknownSession) => {
                ApiErrorResponse::unauthorized("Unknown or missing session token")
            }
            Self::Session(e @ SessionError::InvalidTransition { .. }) => {
                ApiErrorResponse::conflict(e.to_string())
            }

            Self::Auth(AuthError::AlreadyExists) => ApiErrorResponse::conflict("Username already exists"),
            Self::Auth(AuthError::InvalidCredentials) => ApiErrorResponse::unauthorized("Invalid credentials"),
            Self::Auth(e @ AuthError::EmptyInput) => ApiErrorResponse::bad_request(e.to_string()),
            Self::Auth(e) => {
                error!(error = %e, "Authentication backend failure");
                ApiErrorResponse::internal("Authentication failed")
            }

            Self::Evaluation(EvaluationError::NoMeasurements) => {
                ApiErrorResponse::bad_request("Enter measurements and evaluate")
            }
            Self::Evaluation(e) => ApiErrorResponse::bad_request(e.to_string()),
            e @ (Self::NotEvaluated | Self::EmptyMessage) => ApiErrorResponse::bad_request(e.to_string()),

            Self::Storage(e @ StorageError::NotFound { .. }) => ApiErrorResponse::not_found(e.to_string()),
            Self::Storage(e) => {
                error!(error = %e, "Storage failure");
                ApiErrorResponse::internal("Database error")
            }

            Self::Assistant(e) => {
                warn!(error = %e, "Assistant request failed");
                ApiErrorResponse::service_unavailable("Assistant is currently unavailable")
            }
            Self::Report(e) => {
                error!(error = %e, "Report failure");
                ApiErrorResponse::internal("Report generation failed")
            }
        }
    }
}
