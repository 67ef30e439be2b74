//! Encoding and decoding helpers between domain types and SQLite rows.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds,
//! `Z` suffix) so that text order is time order. Rows are first read into
//! `Raw*` structs inside the blocking connection closure, then converted to
//! domain types on the async side.

use chrono::{DateTime, SecondsFormat, Utc};
use portal_core::{
  document::DocumentRecord,
  principal::{Registrar, Student},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str =
  "id, student_id, email, full_name, course, year, phone, created_at";

pub const REGISTRAR_COLUMNS: &str =
  "id, email, full_name, department, phone, created_at";

pub const DOCUMENT_COLUMNS: &str = "id, registrar_id, school, course, \
  document_title, document_type, academic_year, description, filename, \
  original_filename, file_path, file_size, mime_type, uploaded_at";

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `students` row in the column order of [`STUDENT_COLUMNS`].
pub struct RawStudent {
  pub id:         i64,
  pub student_id: String,
  pub email:      String,
  pub full_name:  String,
  pub course:     Option<String>,
  pub year:       Option<i64>,
  pub phone:      Option<String>,
  pub created_at: String,
}

impl RawStudent {
  /// Read from a row whose first columns are [`STUDENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawStudent {
      id:         row.get(0)?,
      student_id: row.get(1)?,
      email:      row.get(2)?,
      full_name:  row.get(3)?,
      course:     row.get(4)?,
      year:       row.get(5)?,
      phone:      row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:         self.id,
      student_id: self.student_id,
      email:      self.email,
      full_name:  self.full_name,
      course:     self.course,
      year:       self.year,
      phone:      self.phone,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `registrars` row in the column order of [`REGISTRAR_COLUMNS`].
pub struct RawRegistrar {
  pub id:         i64,
  pub email:      String,
  pub full_name:  String,
  pub department: Option<String>,
  pub phone:      Option<String>,
  pub created_at: String,
}

impl RawRegistrar {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawRegistrar {
      id:         row.get(0)?,
      email:      row.get(1)?,
      full_name:  row.get(2)?,
      department: row.get(3)?,
      phone:      row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_registrar(self) -> Result<Registrar> {
    Ok(Registrar {
      id:         self.id,
      email:      self.email,
      full_name:  self.full_name,
      department: self.department,
      phone:      self.phone,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `documents` row in the column order of [`DOCUMENT_COLUMNS`].
pub struct RawDocument {
  pub id:                i64,
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
  pub uploaded_at:       String,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawDocument {
      id:                row.get(0)?,
      registrar_id:      row.get(1)?,
      school:            row.get(2)?,
      course:            row.get(3)?,
      document_title:    row.get(4)?,
      document_type:     row.get(5)?,
      academic_year:     row.get(6)?,
      description:       row.get(7)?,
      filename:          row.get(8)?,
      original_filename: row.get(9)?,
      file_path:         row.get(10)?,
      file_size:         row.get(11)?,
      mime_type:         row.get(12)?,
      uploaded_at:       row.get(13)?,
    })
  }

  pub fn into_document(self) -> Result<DocumentRecord> {
    Ok(DocumentRecord {
      id:                self.id,
      registrar_id:      self.registrar_id,
      school:            self.school,
      course:            self.course,
      document_title:    self.document_title,
      document_type:     self.document_type,
      academic_year:     self.academic_year,
      description:       self.description,
      filename:          self.filename,
      original_filename: self.original_filename,
      file_path:         self.file_path,
      file_size:         self.file_size,
      mime_type:         self.mime_type,
      uploaded_at:       decode_dt(&self.uploaded_at)?,
    })
  }
}
