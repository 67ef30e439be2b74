//! Document records: metadata describing one uploaded artifact.
//!
//! The backing file lives under the upload root at a directory derived from
//! `(school, course)`; the record's `file_path` is the absolute path of that
//! file. A record is deleted only by its owning registrar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
  pub id:                i64,
  /// Owning registrar (foreign key into `registrars`).
  pub registrar_id:      i64,
  pub school:            String,
  pub course:            String,
  pub document_title:    String,
  pub document_type:     String,
  pub academic_year:     Option<String>,
  pub description:       Option<String>,
  /// Name of the file as stored on disk.
  pub filename:          String,
  /// Name of the file as the registrar uploaded it.
  pub original_filename: String,
  pub file_path:         String,
  pub file_size:         i64,
  pub mime_type:         String,
  pub uploaded_at:       DateTime<Utc>,
}

/// Input to [`crate::store::PortalStore::insert_document`]. The id and
/// upload timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub registrar_id:      i64,
  pub school:            String,
  pub course:            String,
  pub document_title:    String,
  pub document_type:     String,
  pub academic_year:     Option<String>,
  pub description:       Option<String>,
  pub filename:          String,
  pub original_filename: String,
  pub file_path:         String,
  pub file_size:         i64,
  pub mime_type:         String,
}

/// Parameters for [`crate::store::PortalStore::list_documents`]. Every set
/// field narrows the result; the default returns all documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentFilter {
  pub registrar_id: Option<i64>,
  pub school:       Option<String>,
  pub course:       Option<String>,
}

impl DocumentFilter {
  pub fn owned_by(mut self, registrar_id: i64) -> Self {
    self.registrar_id = Some(registrar_id);
    self
  }
}
