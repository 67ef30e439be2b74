//! Handlers for `/api/chat` endpoints.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use portal_core::store::PortalStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Session,
  error::Error,
  handlers::bad_json,
  relay::{self, ChatReply, Rejected},
};

#[derive(Debug, Deserialize)]
pub struct ChatBody {
  #[serde(default)]
  pub message: String,
}

/// `POST /api/chat`
pub async fn chat<S>(
  State(state): State<AppState<S>>,
  Session(claims): Session,
  body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body.map_err(bad_json)?;
  if body.message.trim().is_empty() {
    return Err(Error::bad_request("Message is required"));
  }

  match relay::relay(state.store.as_ref(), &state.rag, &claims, &body.message).await {
    Ok(reply) => Ok(Json(reply)),
    Err(Rejected(message)) => Err(Error::Internal { message, detail: None }),
  }
}

/// `GET /api/chat/health`. Always 200; the body says whether the chat
/// service answered.
pub async fn health<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  match state.rag.health().await {
    Ok(()) => Json(json!({
      "success": true,
      "rag_api_status": "connected",
      "message": "RAG API is available",
    })),
    Err(e) => {
      tracing::warn!(kind = e.kind(), error = %e, "chat service health check failed");
      Json(json!({
        "success": false,
        "rag_api_status": "disconnected",
        "message": "RAG API is not available. Please ensure Python API server is running.",
      }))
    }
  }
}
