//! Handlers for `/api/documents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/api/documents/upload` | Registrar only; multipart with a PDF `file` part |
//! | `GET`    | `/api/documents` | Optional `?school=&course=`; registrars see their own |
//! | `GET`    | `/api/documents/{id}` | 404 if not found |
//! | `DELETE` | `/api/documents/{id}` | Owning registrar only |

use std::path::Path as FsPath;

use axum::{
  Json,
  extract::{
    Multipart, Path, Query, State,
    multipart::{MultipartError, MultipartRejection},
    rejection::{PathRejection, QueryRejection},
  },
  http::StatusCode,
};
use bytes::Bytes;
use portal_core::{
  document::{DocumentFilter, NewDocument},
  principal::PrincipalKind,
  store::PortalStore,
};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Session,
  error::Error,
  placement::DocumentPlacement,
  rag::RagClient,
};

const TOO_LARGE: &str = "File size exceeds 10MB limit";

// ─── Upload ───────────────────────────────────────────────────────────────────

struct UploadedFile {
  original_name: String,
  content_type:  String,
  bytes:         Bytes,
}

/// Parts of the upload form, as received.
#[derive(Default)]
struct UploadForm {
  file:           Option<UploadedFile>,
  school:         Option<String>,
  course:         Option<String>,
  document_title: Option<String>,
  document_type:  Option<String>,
  academic_year:  Option<String>,
  description:    Option<String>,
}

impl UploadForm {
  async fn read(mut multipart: Multipart) -> Result<Self, Error> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
      let Some(name) = field.name().map(str::to_owned) else {
        continue;
      };
      match name.as_str() {
        "file" => {
          let original_name = field.file_name().unwrap_or_default().to_owned();
          let content_type = field.content_type().unwrap_or_default().to_owned();
          let bytes = field.bytes().await.map_err(multipart_error)?;
          form.file = Some(UploadedFile { original_name, content_type, bytes });
        }
        "school" => form.school = non_empty(field.text().await.map_err(multipart_error)?),
        "course" => form.course = non_empty(field.text().await.map_err(multipart_error)?),
        "documentTitle" => {
          form.document_title = non_empty(field.text().await.map_err(multipart_error)?)
        }
        "documentType" => {
          form.document_type = non_empty(field.text().await.map_err(multipart_error)?)
        }
        "academicYear" => {
          form.academic_year = non_empty(field.text().await.map_err(multipart_error)?)
        }
        "description" => {
          form.description = non_empty(field.text().await.map_err(multipart_error)?)
        }
        _ => {}
      }
    }
    Ok(form)
  }
}

fn non_empty(value: String) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn multipart_error(e: MultipartError) -> Error {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    Error::PayloadTooLarge(TOO_LARGE.to_string())
  } else {
    Error::bad_request(e.body_text())
  }
}

/// `POST /api/documents/upload`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  session: Session,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  session.require(PrincipalKind::Registrar, "Only registrars can upload documents")?;
  let multipart = multipart.map_err(|e| Error::bad_request(e.body_text()))?;
  let form = UploadForm::read(multipart).await?;

  let file = form
    .file
    .ok_or_else(|| Error::bad_request("No file uploaded"))?;
  if !DocumentPlacement::accept(&file.content_type) {
    return Err(Error::bad_request("Only PDF files are allowed"));
  }
  if file.bytes.len() > state.config.max_upload_bytes {
    return Err(Error::PayloadTooLarge(TOO_LARGE.to_string()));
  }

  let (Some(school), Some(course), Some(document_title), Some(document_type)) =
    (form.school, form.course, form.document_title, form.document_type)
  else {
    return Err(Error::bad_request(
      "School, course, document title, and document type are required",
    ));
  };
  state
    .taxonomy
    .validate(&school, &course)
    .map_err(|e| Error::bad_request(e.to_string()))?;

  let stored = state
    .placement
    .store(&school, &course, &file.original_name, &file.bytes)
    .await
    .map_err(|e| state.internal("Error uploading document", &e))?;
  let file_path = stored.path.to_string_lossy().into_owned();

  let input = NewDocument {
    registrar_id: session.0.id,
    school,
    course,
    document_title,
    document_type,
    academic_year: form.academic_year,
    description: form.description,
    filename: stored.filename.clone(),
    original_filename: file.original_name,
    file_path,
    file_size: stored.size as i64,
    mime_type: file.content_type,
  };

  let document = match state.store.insert_document(input).await {
    Ok(document) => document,
    Err(e) => {
      state.placement.discard(&stored.path).await;
      return Err(state.internal("Error uploading document", &e));
    }
  };

  tracing::info!(
    document = document.id,
    path = %document.file_path,
    size = document.file_size,
    "document uploaded"
  );

  spawn_vectorization(
    state.rag.clone(),
    document.file_path.clone(),
    document.school.clone(),
    document.course.clone(),
  );

  Ok(Json(json!({
    "success": true,
    "message": "Document uploaded successfully. Vectorization in progress.",
    "document": document,
  })))
}

/// Ask the chat service to index a freshly uploaded file. Detached; the
/// outcome is only logged.
fn spawn_vectorization(rag: RagClient, file_path: String, school: String, course: String) {
  tokio::spawn(async move {
    match rag.process_document(&file_path, &school, &course).await {
      Ok(answer) if answer.success => {
        tracing::info!(path = %file_path, chunks = ?answer.chunks_created, "document vectorized");
      }
      Ok(answer) => {
        tracing::warn!(path = %file_path, message = ?answer.message, "vectorization failed");
      }
      Err(e) => {
        tracing::warn!(path = %file_path, kind = e.kind(), error = %e, "vectorization request failed");
      }
    }
  });
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /api/documents[?school=<code>&course=<code>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Session(claims): Session,
  query: Result<Query<DocumentFilter>, QueryRejection>,
) -> Result<Json<Value>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Query(requested) = query.map_err(|e| Error::bad_request(e.body_text()))?;
  let filter = DocumentFilter {
    registrar_id: None,
    school:       requested.school,
    course:       requested.course,
  };
  let filter = match claims.kind {
    PrincipalKind::Registrar => filter.owned_by(claims.id),
    PrincipalKind::Student => filter,
  };

  let documents = state
    .store
    .list_documents(filter)
    .await
    .map_err(|e| state.internal("Error fetching documents", &e))?;
  Ok(Json(json!({ "success": true, "documents": documents })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/documents/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Path(id) = id.map_err(|_| Error::bad_request("Invalid document id"))?;
  let document = state
    .store
    .get_document(id)
    .await
    .map_err(|e| state.internal("Error fetching document", &e))?
    .ok_or_else(|| Error::not_found("Document not found"))?;
  Ok(Json(json!({ "success": true, "document": document })))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/documents/{id}`
///
/// The row is authoritative: once it is gone the request succeeds, even if
/// the backing file cannot be removed.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, Error>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  session.require(PrincipalKind::Registrar, "Only registrars can delete documents")?;
  let Path(id) = id.map_err(|_| Error::bad_request("Invalid document id"))?;
  let registrar_id = session.0.id;

  let document = state
    .store
    .get_document(id)
    .await
    .map_err(|e| state.internal("Error deleting document", &e))?
    .ok_or_else(|| Error::not_found("Document not found"))?;
  if document.registrar_id != registrar_id {
    return Err(Error::forbidden("You can only delete your own documents"));
  }

  let deleted = state
    .store
    .delete_document(id, registrar_id)
    .await
    .map_err(|e| state.internal("Error deleting document", &e))?;
  if !deleted {
    return Err(Error::not_found("Document not found or could not be deleted"));
  }

  state.placement.remove(FsPath::new(&document.file_path)).await;
  tracing::info!(document = id, registrar = registrar_id, "document deleted");

  Ok(Json(json!({ "success": true, "message": "Document deleted successfully" })))
}
