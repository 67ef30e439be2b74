//! [`SqliteStore`], the SQLite implementation of [`PortalStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;

use portal_core::{
  document::{DocumentFilter, DocumentRecord, NewDocument},
  principal::{
    Credentials, NewRegistrar, NewStudent, Principal, PrincipalKind, Registrar, Student,
  },
  store::PortalStore,
};

use crate::{
  encode::{
    encode_dt, RawDocument, RawRegistrar, RawStudent, DOCUMENT_COLUMNS, REGISTRAR_COLUMNS,
    STUDENT_COLUMNS,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A portal store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn student_with_hash(&self, email: String) -> Result<Option<Credentials>> {
    let raw: Option<(RawStudent, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {STUDENT_COLUMNS}, password_hash FROM students WHERE email = ?1"),
            rusqlite::params![email],
            |row| Ok((RawStudent::from_row(row)?, row.get(8)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(student, password_hash)| {
        Ok(Credentials {
          principal: Principal::Student(student.into_student()?),
          password_hash,
        })
      })
      .transpose()
  }

  async fn registrar_with_hash(&self, email: String) -> Result<Option<Credentials>> {
    let raw: Option<(RawRegistrar, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {REGISTRAR_COLUMNS}, password_hash FROM registrars WHERE email = ?1"
            ),
            rusqlite::params![email],
            |row| Ok((RawRegistrar::from_row(row)?, row.get(6)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(registrar, password_hash)| {
        Ok(Credentials {
          principal: Principal::Registrar(registrar.into_registrar()?),
          password_hash,
        })
      })
      .transpose()
  }

  async fn student_by_id(&self, id: i64) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            rusqlite::params![id],
            RawStudent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn registrar_by_id(&self, id: i64) -> Result<Option<Registrar>> {
    let raw: Option<RawRegistrar> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REGISTRAR_COLUMNS} FROM registrars WHERE id = ?1"),
            rusqlite::params![id],
            RawRegistrar::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRegistrar::into_registrar).transpose()
  }
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = crate::Error;

  // ── Credentials ───────────────────────────────────────────────────────────

  async fn find_by_email(
    &self,
    kind: PrincipalKind,
    email: String,
  ) -> Result<Option<Credentials>> {
    match kind {
      PrincipalKind::Student => self.student_with_hash(email).await,
      PrincipalKind::Registrar => self.registrar_with_hash(email).await,
    }
  }

  async fn find_by_id(&self, kind: PrincipalKind, id: i64) -> Result<Option<Principal>> {
    Ok(match kind {
      PrincipalKind::Student => self.student_by_id(id).await?.map(Principal::Student),
      PrincipalKind::Registrar => self.registrar_by_id(id).await?.map(Principal::Registrar),
    })
  }

  // ── Provisioning ──────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let created_at = Utc::now().trunc_subsecs(6);
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students
             (student_id, email, password_hash, full_name, course, year, phone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            row.student_id,
            row.email,
            row.password_hash,
            row.full_name,
            row.course,
            row.year,
            row.phone,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Student {
      id,
      student_id: input.student_id,
      email: input.email,
      full_name: input.full_name,
      course: input.course,
      year: input.year,
      phone: input.phone,
      created_at,
    })
  }

  async fn add_registrar(&self, input: NewRegistrar) -> Result<Registrar> {
    let created_at = Utc::now().trunc_subsecs(6);
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO registrars
             (email, password_hash, full_name, department, phone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.email,
            row.password_hash,
            row.full_name,
            row.department,
            row.phone,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Registrar {
      id,
      email: input.email,
      full_name: input.full_name,
      department: input.department,
      phone: input.phone,
      created_at,
    })
  }

  async fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
    match kind {
      PrincipalKind::Student => {
        let raws: Vec<RawStudent> = self
          .conn
          .call(|conn| {
            let mut stmt =
              conn.prepare(&format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY id"))?;
            let rows = stmt
              .query_map([], RawStudent::from_row)?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
          })
          .await?;
        raws
          .into_iter()
          .map(|r| r.into_student().map(Principal::Student))
          .collect()
      }
      PrincipalKind::Registrar => {
        let raws: Vec<RawRegistrar> = self
          .conn
          .call(|conn| {
            let mut stmt = conn
              .prepare(&format!("SELECT {REGISTRAR_COLUMNS} FROM registrars ORDER BY id"))?;
            let rows = stmt
              .query_map([], RawRegistrar::from_row)?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
          })
          .await?;
        raws
          .into_iter()
          .map(|r| r.into_registrar().map(Principal::Registrar))
          .collect()
      }
    }
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn insert_document(&self, input: NewDocument) -> Result<DocumentRecord> {
    let uploaded_at = Utc::now().trunc_subsecs(6);
    let at_str = encode_dt(uploaded_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             registrar_id, school, course, document_title, document_type,
             academic_year, description, filename, original_filename,
             file_path, file_size, mime_type, uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            row.registrar_id,
            row.school,
            row.course,
            row.document_title,
            row.document_type,
            row.academic_year,
            row.description,
            row.filename,
            row.original_filename,
            row.file_path,
            row.file_size,
            row.mime_type,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(DocumentRecord {
      id,
      registrar_id: input.registrar_id,
      school: input.school,
      course: input.course,
      document_title: input.document_title,
      document_type: input.document_type,
      academic_year: input.academic_year,
      description: input.description,
      filename: input.filename,
      original_filename: input.original_filename,
      file_path: input.file_path,
      file_size: input.file_size,
      mime_type: input.mime_type,
      uploaded_at,
    })
  }

  async fn list_documents(&self, filter: DocumentFilter) -> Result<Vec<DocumentRecord>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        // Unset filters bind NULL and drop out of the predicate.
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE (?1 IS NULL OR registrar_id = ?1)
             AND (?2 IS NULL OR school = ?2)
             AND (?3 IS NULL OR course = ?3)
           ORDER BY uploaded_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![filter.registrar_id, filter.school, filter.course],
            RawDocument::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>> {
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
            rusqlite::params![id],
            RawDocument::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn delete_document(&self, id: i64, registrar_id: i64) -> Result<bool> {
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE id = ?1 AND registrar_id = ?2",
          rusqlite::params![id, registrar_id],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }
}
