//! Error types for `portal-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown school: {0:?}")]
  UnknownSchool(String),

  #[error("unknown course {course:?} for school {school:?}")]
  UnknownCourse { school: String, course: String },

  #[error("invalid taxonomy: {0}")]
  InvalidTaxonomy(String),

  #[error("taxonomy parse error: {0}")]
  TaxonomyParse(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
