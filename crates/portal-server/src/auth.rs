//! Bearer-token extractor and argon2 password helpers.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use portal_core::{principal::PrincipalKind, store::PortalStore};
use rand_core::OsRng;

use crate::{AppState, error::Error, session::Claims};

/// The verified claims of the request's bearer token.
///
/// Present in a handler means the request carried a valid, unexpired token.
pub struct Session(pub Claims);

impl Session {
  /// Reject with 403 unless the token was issued to a principal of `kind`.
  pub fn require(&self, kind: PrincipalKind, message: &str) -> Result<(), Error> {
    if self.0.kind == kind {
      Ok(())
    } else {
      Err(Error::forbidden(message))
    }
  }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)
      .ok_or_else(|| Error::Unauthorized("No token provided".to_string()))?;
    let claims = state.sessions.verify(token)?;
    Ok(Session(claims))
  }
}

/// Hash `password` into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Check `password` against a stored PHC string. An unparsable stored hash
/// counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}
