//! SQL schema for the portal SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema generation for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id    TEXT UNIQUE NOT NULL,
    email         TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    full_name     TEXT NOT NULL,
    course        TEXT,
    year          INTEGER,
    phone         TEXT,
    created_at    TEXT NOT NULL            -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS registrars (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    full_name     TEXT NOT NULL,
    department    TEXT,
    phone         TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    registrar_id      INTEGER NOT NULL REFERENCES registrars(id) ON DELETE CASCADE,
    school            TEXT NOT NULL,
    course            TEXT NOT NULL,
    document_title    TEXT NOT NULL,
    document_type     TEXT NOT NULL,
    academic_year     TEXT,
    description       TEXT,
    filename          TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    file_path         TEXT NOT NULL,
    file_size         INTEGER NOT NULL,
    mime_type         TEXT NOT NULL DEFAULT 'application/pdf',
    uploaded_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_student_email             ON students(email);
CREATE INDEX IF NOT EXISTS idx_registrar_email           ON registrars(email);
CREATE INDEX IF NOT EXISTS idx_documents_school          ON documents(school);
CREATE INDEX IF NOT EXISTS idx_documents_course          ON documents(course);
CREATE INDEX IF NOT EXISTS idx_documents_school_course   ON documents(school, course);
CREATE INDEX IF NOT EXISTS idx_documents_registrar       ON documents(registrar_id);

PRAGMA user_version = 1;
";
