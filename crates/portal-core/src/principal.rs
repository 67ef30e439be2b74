//! Principals, the two kinds of authenticated actor.
//!
//! A principal is provisioned administratively and never updated or deleted
//! by the portal itself. The password hash travels only inside
//! [`Credentials`], which is returned by email lookups used for login.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which table a principal lives in, and which routes it may use.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrincipalKind {
  Student,
  Registrar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:         i64,
  /// Institution-issued identifier, e.g. `KR2024001`.
  pub student_id: String,
  pub email:      String,
  pub full_name:  String,
  /// Free-text programme name; fed to [`crate::classify::classify`].
  pub course:     Option<String>,
  pub year:       Option<i64>,
  pub phone:      Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrar {
  pub id:         i64,
  pub email:      String,
  pub full_name:  String,
  pub department: Option<String>,
  pub phone:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Either kind of principal, without credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Principal {
  Student(Student),
  Registrar(Registrar),
}

impl Principal {
  pub fn kind(&self) -> PrincipalKind {
    match self {
      Principal::Student(_) => PrincipalKind::Student,
      Principal::Registrar(_) => PrincipalKind::Registrar,
    }
  }

  pub fn id(&self) -> i64 {
    match self {
      Principal::Student(s) => s.id,
      Principal::Registrar(r) => r.id,
    }
  }

  pub fn email(&self) -> &str {
    match self {
      Principal::Student(s) => &s.email,
      Principal::Registrar(r) => &r.email,
    }
  }

  pub fn full_name(&self) -> &str {
    match self {
      Principal::Student(s) => &s.full_name,
      Principal::Registrar(r) => &r.full_name,
    }
  }

  /// The institution-issued student identifier; `None` for registrars.
  pub fn student_id(&self) -> Option<&str> {
    match self {
      Principal::Student(s) => Some(&s.student_id),
      Principal::Registrar(_) => None,
    }
  }
}

/// A principal together with its stored argon2 PHC string.
#[derive(Clone)]
pub struct Credentials {
  pub principal:     Principal,
  pub password_hash: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("principal", &self.principal)
      .field("password_hash", &"<redacted>")
      .finish()
  }
}

// ─── Provisioning inputs ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewStudent {
  pub student_id:    String,
  pub email:         String,
  pub password_hash: String,
  pub full_name:     String,
  pub course:        Option<String>,
  pub year:          Option<i64>,
  pub phone:         Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRegistrar {
  pub email:         String,
  pub password_hash: String,
  pub full_name:     String,
  pub department:    Option<String>,
  pub phone:         Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registrar() -> Registrar {
    Registrar {
      id:         7,
      email:      "registrar@example.edu".into(),
      full_name:  "Dr. R. Kumar".into(),
      department: Some("Registrar Office".into()),
      phone:      None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn kind_parses_lowercase_only() {
    assert_eq!("student".parse::<PrincipalKind>().unwrap(), PrincipalKind::Student);
    assert_eq!("registrar".parse::<PrincipalKind>().unwrap(), PrincipalKind::Registrar);
    assert!("admin".parse::<PrincipalKind>().is_err());
    assert_eq!(PrincipalKind::Registrar.to_string(), "registrar");
  }

  #[test]
  fn registrar_has_no_student_id() {
    let p = Principal::Registrar(registrar());
    assert_eq!(p.kind(), PrincipalKind::Registrar);
    assert_eq!(p.id(), 7);
    assert!(p.student_id().is_none());
  }

  #[test]
  fn credentials_debug_hides_hash() {
    let creds = Credentials {
      principal:     Principal::Registrar(registrar()),
      password_hash: "$argon2id$v=19$secret".into(),
    };
    let dbg = format!("{creds:?}");
    assert!(!dbg.contains("argon2id"), "{dbg}");
  }

  #[test]
  fn principal_serializes_without_variant_tag() {
    let json = serde_json::to_value(Principal::Registrar(registrar())).unwrap();
    assert_eq!(json["email"], "registrar@example.edu");
    assert!(json.get("Registrar").is_none());
  }
}
