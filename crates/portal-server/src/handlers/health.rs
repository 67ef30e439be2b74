//! `GET /api/health`: liveness.

use axum::Json;
use serde_json::{Value, json};

pub async fn handler() -> Json<Value> {
  Json(json!({ "status": "ok", "message": "Server is running" }))
}
