pub mod auth;
pub mod chat;
pub mod documents;
pub mod health;
pub mod taxonomy;

use axum::extract::rejection::JsonRejection;

use crate::error::Error;

/// Map a JSON body rejection to a 400 with the shared error envelope.
pub(super) fn bad_json(rejection: JsonRejection) -> Error {
  tracing::debug!(error = %rejection, "rejected JSON body");
  Error::bad_request("Invalid request body")
}
