//! The static school → course taxonomy.
//!
//! Loaded once at startup from TOML and shared read-only. It is used for
//! two things only: validating upload input and deriving storage
//! directories. The `base` school is a reserved sentinel for documents not
//! tied to a specific course; its "courses" are general categories.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// School code of the general, course-independent repository.
pub const BASE_SCHOOL: &str = "base";

const BUILTIN: &str = include_str!("../taxonomy.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub code:  String,
  pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
  pub code:    String,
  /// Display name, e.g. "School of Law".
  pub name:    String,
  pub courses: Vec<Course>,
}

impl School {
  pub fn is_base(&self) -> bool { self.code == BASE_SCHOOL }

  pub fn course(&self, code: &str) -> Option<&Course> {
    self.courses.iter().find(|c| c.code == code)
  }
}

/// Ordered list of schools, each with an ordered list of courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
  schools: Vec<School>,
}

impl Taxonomy {
  /// The taxonomy compiled into this crate.
  pub fn builtin() -> Result<Self> { Self::from_toml(BUILTIN) }

  /// Parse and check a taxonomy document.
  ///
  /// Codes become directory names, so they are restricted to lowercase
  /// ASCII letters, digits and `_`.
  pub fn from_toml(source: &str) -> Result<Self> {
    let taxonomy: Taxonomy = toml::from_str(source)?;
    taxonomy.check()?;
    Ok(taxonomy)
  }

  fn check(&self) -> Result<()> {
    if !self.schools.iter().any(School::is_base) {
      return Err(Error::InvalidTaxonomy(format!(
        "missing the {BASE_SCHOOL:?} school"
      )));
    }

    for (i, school) in self.schools.iter().enumerate() {
      if !is_code(&school.code) {
        return Err(Error::InvalidTaxonomy(format!(
          "bad school code {:?}",
          school.code
        )));
      }
      if self.schools[..i].iter().any(|s| s.code == school.code) {
        return Err(Error::InvalidTaxonomy(format!(
          "duplicate school code {:?}",
          school.code
        )));
      }
      if school.courses.is_empty() {
        return Err(Error::InvalidTaxonomy(format!(
          "school {:?} has no courses",
          school.code
        )));
      }
      for (j, course) in school.courses.iter().enumerate() {
        if !is_code(&course.code) {
          return Err(Error::InvalidTaxonomy(format!(
            "bad course code {:?} in school {:?}",
            course.code, school.code
          )));
        }
        if school.courses[..j].iter().any(|c| c.code == course.code) {
          return Err(Error::InvalidTaxonomy(format!(
            "duplicate course code {:?} in school {:?}",
            course.code, school.code
          )));
        }
      }
    }
    Ok(())
  }

  pub fn schools(&self) -> &[School] { &self.schools }

  pub fn school(&self, code: &str) -> Option<&School> {
    self.schools.iter().find(|s| s.code == code)
  }

  /// Check that `course` is listed under `school`.
  pub fn validate(&self, school: &str, course: &str) -> Result<()> {
    let entry = self
      .school(school)
      .ok_or_else(|| Error::UnknownSchool(school.to_owned()))?;
    entry.course(course).ok_or_else(|| Error::UnknownCourse {
      school: school.to_owned(),
      course: course.to_owned(),
    })?;
    Ok(())
  }
}

fn is_code(s: &str) -> bool {
  !s.is_empty()
    && s
      .bytes()
      .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}
