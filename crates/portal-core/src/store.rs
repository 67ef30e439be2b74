//! The `PortalStore` trait.
//!
//! Implemented by storage backends (e.g. `portal-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend. Backends
//! surface their own errors to the caller and never retry.

use std::future::Future;

use crate::{
  document::{DocumentFilter, DocumentRecord, NewDocument},
  principal::{Credentials, NewRegistrar, NewStudent, Principal, PrincipalKind, Registrar, Student},
};

/// Abstraction over the portal's relational store.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait PortalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Credentials ───────────────────────────────────────────────────────

  /// Look up a principal of `kind` by (already normalised) email, including
  /// its password hash. Returns `None` if no such principal exists.
  fn find_by_email(
    &self,
    kind: PrincipalKind,
    email: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  /// Look up a principal of `kind` by row id. The password hash is never
  /// read.
  fn find_by_id(
    &self,
    kind: PrincipalKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  // ── Provisioning ──────────────────────────────────────────────────────

  /// Create a student. Fails if the email or student id is taken.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Create a registrar. Fails if the email is taken.
  fn add_registrar(
    &self,
    input: NewRegistrar,
  ) -> impl Future<Output = Result<Registrar, Self::Error>> + Send + '_;

  /// List every principal of `kind`, ordered by id.
  fn list_principals(
    &self,
    kind: PrincipalKind,
  ) -> impl Future<Output = Result<Vec<Principal>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Persist a document record and return it with its assigned id and
  /// upload timestamp.
  fn insert_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<DocumentRecord, Self::Error>> + Send + '_;

  /// List documents matching `filter`, newest first.
  fn list_documents(
    &self,
    filter: DocumentFilter,
  ) -> impl Future<Output = Result<Vec<DocumentRecord>, Self::Error>> + Send + '_;

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_document(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<DocumentRecord>, Self::Error>> + Send + '_;

  /// Delete the document `id` only if it is owned by `registrar_id`.
  /// Returns whether a row was removed.
  fn delete_document(
    &self,
    id: i64,
    registrar_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
