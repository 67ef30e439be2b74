//! Document placement: where uploaded PDFs live on disk.
//!
//! Files are laid out as `<root>/<school>/<course>/<stored name>`, with the
//! `base` school holding the general categories. Directory creation is
//! create-if-absent so concurrent uploads into one pair never race, and
//! files are opened create-new so a name collision can never overwrite an
//! existing document.

use std::{
  io,
  path::{Path, PathBuf},
};

use chrono::Utc;
use portal_core::taxonomy::BASE_SCHOOL;
use rand_core::{OsRng, RngCore};
use tokio::{fs, io::AsyncWriteExt};

/// The only MIME type accepted for upload.
pub const PDF_MIME: &str = "application/pdf";

const MAX_STEM_LEN: usize = 100;
const WRITE_ATTEMPTS: usize = 3;

/// A file written by [`DocumentPlacement::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
  /// Generated on-disk name.
  pub filename: String,
  /// Absolute path of the file.
  pub path:     PathBuf,
  pub size:     u64,
}

#[derive(Debug, Clone)]
pub struct DocumentPlacement {
  root: PathBuf,
}

impl DocumentPlacement {
  /// Create the upload root if needed and anchor the placement at its
  /// canonical path.
  pub async fn new(root: impl AsRef<Path>) -> io::Result<Self> {
    fs::create_dir_all(root.as_ref()).await?;
    let root = fs::canonicalize(root.as_ref()).await?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// The directory for `(school, course)`, without touching the filesystem.
  ///
  /// Callers validate both codes against the taxonomy first; codes are
  /// restricted to `[a-z0-9_]`, so they never escape the root.
  pub fn storage_dir(&self, school: &str, course: &str) -> PathBuf {
    if school == BASE_SCHOOL {
      self.root.join(BASE_SCHOOL).join(course)
    } else {
      self.root.join(school).join(course)
    }
  }

  /// Resolve and create the directory for `(school, course)`. Idempotent.
  pub async fn resolve_storage_path(&self, school: &str, course: &str) -> io::Result<PathBuf> {
    let dir = self.storage_dir(school, course);
    fs::create_dir_all(&dir).await?;
    Ok(dir)
  }

  /// Whether a part with this content type may be stored.
  pub fn accept(mime: &str) -> bool {
    mime
      .split(';')
      .next()
      .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
  }

  /// Write `bytes` under `(school, course)` with a freshly generated name.
  pub async fn store(
    &self,
    school: &str,
    course: &str,
    original_name: &str,
    bytes: &[u8],
  ) -> io::Result<StoredFile> {
    let dir = self.resolve_storage_path(school, course).await?;

    let mut last_err = None;
    for _ in 0..WRITE_ATTEMPTS {
      let filename = generate_stored_name(original_name);
      let path = dir.join(&filename);
      match write_new(&path, bytes).await {
        Ok(()) => {
          return Ok(StoredFile { filename, path, size: bytes.len() as u64 });
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
        Err(e) => return Err(e),
      }
    }
    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)))
  }

  /// Delete a file written moments ago whose record could not be saved.
  pub async fn discard(&self, path: &Path) {
    match fs::remove_file(path).await {
      Ok(()) => tracing::info!(path = %path.display(), "removed orphaned upload"),
      Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned upload"),
    }
  }

  /// Best-effort removal of a document's backing file.
  pub async fn remove(&self, path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
      tracing::warn!(path = %path.display(), error = %e, "failed to remove document file");
    }
  }
}

async fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
  let mut file = fs::OpenOptions::new()
    .write(true)
    .create_new(true)
    .open(path)
    .await?;
  if let Err(e) = async {
    file.write_all(bytes).await?;
    file.sync_all().await
  }
  .await
  {
    drop(file);
    remove_partial(path).await;
    return Err(e);
  }
  Ok(())
}

/// Remove the remains of a failed write. Returns whether the file is gone.
async fn remove_partial(path: &Path) -> bool {
  match fs::remove_file(path).await {
    Ok(()) => true,
    Err(e) => {
      tracing::warn!(
        path = %path.display(),
        error = %e,
        "failed to remove partially written upload"
      );
      false
    }
  }
}

/// Build `<unix millis>-<random>-<sanitised stem><.ext>` from an uploaded
/// file name. Any directory part of `original` is dropped.
pub fn generate_stored_name(original: &str) -> String {
  let base = original
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or_default();
  let (stem, ext) = match base.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
    _ => (base, None),
  };

  let mut stem: String = stem
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .take(MAX_STEM_LEN)
    .collect();
  if stem.trim_matches('_').is_empty() {
    stem = "document".to_string();
  }

  let ext: String = ext
    .map(|e| e.chars().filter(char::is_ascii_alphanumeric).collect())
    .unwrap_or_default();

  let millis = Utc::now().timestamp_millis();
  let random = OsRng.next_u32() % 1_000_000_000;
  if ext.is_empty() {
    format!("{millis}-{random}-{stem}")
  } else {
    format!("{millis}-{random}-{stem}.{ext}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  async fn placement() -> (TempDir, DocumentPlacement) {
    let dir = TempDir::new().unwrap();
    let placement = DocumentPlacement::new(dir.path()).await.unwrap();
    (dir, placement)
  }

  #[tokio::test]
  async fn resolve_is_deterministic_and_idempotent() {
    let (_dir, p) = placement().await;
    let first = p.resolve_storage_path("soet", "btech_cse").await.unwrap();
    let second = p.resolve_storage_path("soet", "btech_cse").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, p.root().join("soet").join("btech_cse"));
    assert!(first.is_dir());
  }

  #[tokio::test]
  async fn base_documents_go_under_base() {
    let (_dir, p) = placement().await;
    let dir = p.resolve_storage_path("base", "admissions").await.unwrap();
    assert_eq!(dir, p.root().join("base").join("admissions"));
  }

  #[tokio::test]
  async fn concurrent_resolves_do_not_fail() {
    let (_dir, p) = placement().await;
    let (a, b, c) = tokio::join!(
      p.resolve_storage_path("sol", "llb"),
      p.resolve_storage_path("sol", "llb"),
      p.resolve_storage_path("sol", "llb"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
  }

  #[test]
  fn accepts_only_pdf() {
    assert!(DocumentPlacement::accept("application/pdf"));
    assert!(DocumentPlacement::accept("application/PDF; charset=binary"));
    assert!(!DocumentPlacement::accept("image/png"));
    assert!(!DocumentPlacement::accept("application/pdfx"));
    assert!(!DocumentPlacement::accept(""));
  }

  #[test]
  fn stored_name_keeps_extension_and_drops_directories() {
    let name = generate_stored_name("../../etc/Exam Schedule (v2).pdf");
    assert!(name.ends_with("-Exam_Schedule__v2_.pdf"), "{name}");
    assert!(!name.contains('/'));
    assert!(!name.contains(".."));

    let mut parts = name.splitn(3, '-');
    assert!(parts.next().unwrap().parse::<i64>().is_ok());
    assert!(parts.next().unwrap().parse::<u32>().unwrap() < 1_000_000_000);
  }

  #[test]
  fn stored_names_differ() {
    assert_ne!(generate_stored_name("a.pdf"), generate_stored_name("a.pdf"));
  }

  #[test]
  fn stored_name_without_usable_stem() {
    assert!(generate_stored_name("???.pdf").ends_with("-document.pdf"));
    assert!(generate_stored_name("").ends_with("-document"));
    assert!(generate_stored_name(".pdf").ends_with("-_pdf"));
  }

  #[tokio::test]
  async fn store_writes_one_file_and_discard_removes_it() {
    let (_dir, p) = placement().await;
    let stored = p.store("soc", "bcom", "notes.pdf", b"%PDF-1.4").await.unwrap();
    assert_eq!(stored.size, 8);
    assert_eq!(stored.path.parent().unwrap(), p.root().join("soc").join("bcom"));
    assert_eq!(std::fs::read(&stored.path).unwrap(), b"%PDF-1.4");

    p.discard(&stored.path).await;
    assert!(!stored.path.exists());
  }

  #[tokio::test]
  async fn write_new_refuses_to_overwrite() {
    let (_dir, p) = placement().await;
    let path = p.root().join("taken.pdf");
    write_new(&path, b"first").await.unwrap();
    let err = write_new(&path, b"second").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(&path).unwrap(), b"first");
  }

  #[tokio::test]
  async fn partial_write_cleanup_reports_outcome() {
    let dir = TempDir::new().unwrap();
    let partial = dir.path().join("partial.pdf");
    std::fs::write(&partial, b"%PDF-1.4 trunc").unwrap();

    assert!(remove_partial(&partial).await);
    assert!(!partial.exists());
    assert!(!remove_partial(&partial).await);
  }

  #[tokio::test]
  async fn remove_missing_file_is_not_an_error() {
    let (_dir, p) = placement().await;
    p.remove(&p.root().join("never-existed.pdf")).await;
  }
}
