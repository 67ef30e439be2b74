//! Handlers for `/api/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/login` | Body: `{"email", "password", "userType"}` |
//! | `GET`  | `/api/auth/verify` | Bearer token; returns its claims |

use std::str::FromStr as _;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use portal_core::{principal::PrincipalKind, store::PortalStore};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
  AppState,
  auth::{Session, verify_password},
  error::Error,
  handlers::bad_json,
};

const LOGIN_FAILED: &str = "Invalid email or password";
const LOGIN_ERROR: &str = "Internal server error. Please try again later.";

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:     Option<String>,
  pub password:  Option<String>,
  #[serde(rename = "userType")]
  pub user_type: Option<String>,
}

/// `POST /api/auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<Value>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body.map_err(bad_json)?;

  let (Some(email), Some(password)) = (body.email, body.password) else {
    return Err(Error::bad_request("Email and password are required"));
  };
  if email.trim().is_empty() || password.is_empty() {
    return Err(Error::bad_request("Email and password are required"));
  }

  let kind = match body.user_type.as_deref() {
    None => PrincipalKind::Student,
    Some(raw) => {
      PrincipalKind::from_str(raw).map_err(|_| Error::bad_request("Invalid user type"))?
    }
  };

  let email = email.trim().to_lowercase();
  if !is_valid_email(&email) {
    return Err(Error::bad_request("Invalid email format"));
  }

  let credentials = state
    .store
    .find_by_email(kind, email.clone())
    .await
    .map_err(|e| state.internal(LOGIN_ERROR, &e))?;

  let Some(credentials) = credentials else {
    tracing::debug!(%email, %kind, "login failed: unknown email");
    return Err(Error::Unauthorized(LOGIN_FAILED.to_string()));
  };

  let hash = credentials.password_hash.clone();
  let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
    .await
    .map_err(|e| state.internal(LOGIN_ERROR, &e))?;
  if !matches {
    tracing::debug!(%email, %kind, "login failed: wrong password");
    return Err(Error::Unauthorized(LOGIN_FAILED.to_string()));
  }

  let token = state
    .sessions
    .issue(&credentials.principal)
    .map_err(|e| state.internal(LOGIN_ERROR, &e))?;

  tracing::info!(user = credentials.principal.id(), %kind, "login succeeded");

  let mut body = Map::new();
  body.insert("success".into(), json!(true));
  body.insert("message".into(), json!("Login successful"));
  body.insert("token".into(), json!(token));
  body.insert("userType".into(), json!(kind));
  body.insert(kind.as_ref().to_string(), json!(credentials.principal));
  Ok(Json(Value::Object(body)))
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with text on both sides.
fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  let clean = |s: &str| !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '@');
  clean(local)
    && clean(domain)
    && domain
      .char_indices()
      .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

// ─── Verify ───────────────────────────────────────────────────────────────────

/// `GET /api/auth/verify`
pub async fn verify(Session(claims): Session) -> Json<Value> {
  Json(json!({ "success": true, "user": claims }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_format() {
    assert!(is_valid_email("rahul@krmu.edu.in"));
    assert!(is_valid_email("a@b.c"));
    assert!(!is_valid_email("rahul"));
    assert!(!is_valid_email("rahul@localhost"));
    assert!(!is_valid_email("@example.edu"));
    assert!(!is_valid_email("ra hul@example.edu"));
    assert!(!is_valid_email("a@b@example.edu"));
    assert!(!is_valid_email("a@.edu"));
    assert!(!is_valid_email("a@example."));
  }
}
