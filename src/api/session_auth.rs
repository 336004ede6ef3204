//! Session token extractor

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use super::envelope::ApiErrorResponse;
use super::handlers::ApiState;
use crate::session::SharedSession;

/// The caller's session, resolved from `Authorization: Bearer <token>`.
pub struct SessionAuth {
    pub session: SharedSession,
}

/// Extract Bearer token from Authorization header.
fn extract_bearer(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl FromRequestParts<ApiState> for SessionAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts)
            .ok_or_else(|| ApiErrorResponse::unauthorized("Missing Bearer token"))?;

        let session = state
            .sessions
            .get(&token)
            .await
            .map_err(|_| ApiErrorResponse::unauthorized("Unknown or missing session token"))?;

        Ok(Self { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header("authorization", h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&parts(Some("Bearer abc"))).as_deref(), Some("abc"));
        assert_eq!(extract_bearer(&parts(Some("Basic abc"))), None);
        assert_eq!(extract_bearer(&parts(Some("Bearer   "))), None);
        assert_eq!(extract_bearer(&parts(None)), None);
    }
}
