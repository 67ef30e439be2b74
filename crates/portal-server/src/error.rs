//! Error types and axum `IntoResponse` implementation.
//!
//! Every error renders as `{"success": false, "message": "..."}`. Internal
//! errors carry their source text as an extra `"error"` field only when the
//! server is configured to expose it.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("unauthorized: {0}")]
  Unauthorized(String),
  #[error("forbidden: {0}")]
  Forbidden(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("payload too large: {0}")]
  PayloadTooLarge(String),
  #[error("{message}")]
  Internal {
    message: String,
    /// Source error text, present only when exposure is enabled.
    detail:  Option<String>,
  },
}

impl Error {
  pub fn bad_request(msg: impl Into<String>) -> Self { Error::BadRequest(msg.into()) }

  pub fn forbidden(msg: impl Into<String>) -> Self { Error::Forbidden(msg.into()) }

  pub fn not_found(msg: impl Into<String>) -> Self { Error::NotFound(msg.into()) }

  /// Log `source` and wrap it behind a user-facing `message`.
  pub fn internal(
    message: impl Into<String>,
    source: &(dyn std::error::Error + 'static),
    expose: bool,
  ) -> Self {
    let message = message.into();
    tracing::error!(error = %source, "{message}");
    Error::Internal {
      message,
      detail: expose.then(|| source.to_string()),
    }
  }
}

impl From<SessionError> for Error {
  fn from(e: SessionError) -> Self {
    tracing::debug!(error = %e, "rejected session token");
    Error::Unauthorized("Invalid or expired token".to_string())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      Error::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "success": false, "message": m })),
      Error::Unauthorized(m) => (StatusCode::UNAUTHORIZED, json!({ "success": false, "message": m })),
      Error::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "success": false, "message": m })),
      Error::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "success": false, "message": m })),
      Error::PayloadTooLarge(m) => {
        (StatusCode::PAYLOAD_TOO_LARGE, json!({ "success": false, "message": m }))
      }
      Error::Internal { message, detail: Some(detail) } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "success": false, "message": message, "error": detail }),
      ),
      Error::Internal { message, detail: None } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "success": false, "message": message }),
      ),
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn internal_detail_hidden_by_default() {
    let io = std::io::Error::other("disk on fire");
    let resp = Error::internal("Error uploading document", &io, false).into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Error uploading document");
    assert!(json.get("error").is_none());
  }

  #[tokio::test]
  async fn internal_detail_shown_when_exposed() {
    let io = std::io::Error::other("disk on fire");
    let json = body_json(Error::internal("Error uploading document", &io, true).into_response()).await;
    assert_eq!(json["error"], "disk on fire");
  }

  #[tokio::test]
  async fn session_errors_collapse_to_401() {
    let resp = Error::from(SessionError::Expired).into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Invalid or expired token");
  }
}
