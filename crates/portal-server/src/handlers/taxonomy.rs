//! `GET /api/taxonomy`: the school/course lists used by the upload form.

use axum::{Json, extract::State};
use portal_core::{store::PortalStore, taxonomy::School};
use serde_json::{Value, json};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let schools: &[School] = state.taxonomy.schools();
  Json(json!({ "success": true, "schools": schools }))
}
