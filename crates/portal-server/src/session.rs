//! Stateless session tokens.
//!
//! A token is a compact HS256 JWT: `header.claims.signature`, each part
//! base64url without padding, signed with HMAC-SHA256 over the first two
//! parts using the server secret. Nothing is stored server-side, so a token
//! stays valid until it expires; there is no revocation and no refresh.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use portal_core::principal::{Principal, PrincipalKind};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// What a token says about its bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub id:         i64,
  pub email:      String,
  #[serde(rename = "userType")]
  pub kind:       PrincipalKind,
  /// Present only on student tokens.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student_id: Option<String>,
  /// Issued-at, Unix seconds.
  pub iat:        i64,
  /// Expiry, Unix seconds.
  pub exp:        i64,
}

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("malformed token")]
  Malformed,
  #[error("token signature mismatch")]
  Signature,
  #[error("token expired")]
  Expired,
  #[error("invalid signing key")]
  Key,
  #[error("claims encoding error: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Issues and verifies session tokens with one server-held secret.
pub struct SessionIssuer {
  key: Vec<u8>,
  ttl: Duration,
}

impl SessionIssuer {
  pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
    Self { key: secret.as_ref().to_vec(), ttl }
  }

  pub fn issue(&self, principal: &Principal) -> Result<String, SessionError> {
    self.issue_at(principal, Utc::now())
  }

  /// Issue a token as if the current time were `now`.
  pub fn issue_at(
    &self,
    principal: &Principal,
    now: DateTime<Utc>,
  ) -> Result<String, SessionError> {
    let claims = Claims {
      id:         principal.id(),
      email:      principal.email().to_owned(),
      kind:       principal.kind(),
      student_id: principal.student_id().map(str::to_owned),
      iat:        now.timestamp(),
      exp:        (now + self.ttl).timestamp(),
    };

    let signing_input = format!(
      "{}.{}",
      B64.encode(HEADER),
      B64.encode(serde_json::to_vec(&claims)?)
    );
    let mut mac = self.mac()?;
    mac.update(signing_input.as_bytes());
    let signature = B64.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
  }

  pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
    self.verify_at(token, Utc::now())
  }

  /// Verify a token as if the current time were `now`.
  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, SessionError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
      (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(SessionError::Malformed);
    };

    let header_json: serde_json::Value = B64
      .decode(header)
      .ok()
      .and_then(|bytes| serde_json::from_slice(&bytes).ok())
      .ok_or(SessionError::Malformed)?;
    if header_json.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
      return Err(SessionError::Malformed);
    }

    let signature = B64.decode(signature).map_err(|_| SessionError::Malformed)?;
    let mut mac = self.mac()?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac
      .verify_slice(&signature)
      .map_err(|_| SessionError::Signature)?;

    let claims: Claims = B64
      .decode(payload)
      .ok()
      .and_then(|bytes| serde_json::from_slice(&bytes).ok())
      .ok_or(SessionError::Malformed)?;

    if now.timestamp() >= claims.exp {
      return Err(SessionError::Expired);
    }
    Ok(claims)
  }

  fn mac(&self) -> Result<HmacSha256, SessionError> {
    HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::Key)
  }
}

#[cfg(test)]
mod tests {
  use portal_core::principal::{Registrar, Student};

  use super::*;

  fn issuer(secret: &str) -> SessionIssuer { SessionIssuer::new(secret, Duration::days(7)) }

  fn student() -> Principal {
    Principal::Student(Student {
      id:         3,
      student_id: "KR2024003".into(),
      email:      "amit@example.edu".into(),
      full_name:  "Amit Kumar".into(),
      course:     Some("BBA".into()),
      year:       Some(1),
      phone:      None,
      created_at: Utc::now(),
    })
  }

  fn registrar() -> Principal {
    Principal::Registrar(Registrar {
      id:         1,
      email:      "registrar@example.edu".into(),
      full_name:  "Registrar".into(),
      department: None,
      phone:      None,
      created_at: Utc::now(),
    })
  }

  #[test]
  fn issued_token_verifies_immediately() {
    let s = issuer("secret");
    let token = s.issue(&student()).unwrap();
    let claims = s.verify(&token).unwrap();
    assert_eq!(claims.id, 3);
    assert_eq!(claims.kind, PrincipalKind::Student);
    assert_eq!(claims.student_id.as_deref(), Some("KR2024003"));
    assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
  }

  #[test]
  fn registrar_token_has_no_student_id() {
    let s = issuer("secret");
    let claims = s.verify(&s.issue(&registrar()).unwrap()).unwrap();
    assert_eq!(claims.kind, PrincipalKind::Registrar);
    assert!(claims.student_id.is_none());
  }

  #[test]
  fn token_fails_after_expiry_window() {
    let s = issuer("secret");
    let issued = Utc::now();
    let token = s.issue_at(&student(), issued).unwrap();

    let just_before = issued + Duration::days(7) - Duration::seconds(1);
    assert!(s.verify_at(&token, just_before).is_ok());

    let at_expiry = issued + Duration::days(7);
    assert!(matches!(s.verify_at(&token, at_expiry), Err(SessionError::Expired)));
  }

  #[test]
  fn token_from_other_secret_fails() {
    let token = issuer("secret-a").issue(&student()).unwrap();
    assert!(matches!(
      issuer("secret-b").verify(&token),
      Err(SessionError::Signature)
    ));
  }

  #[test]
  fn tampered_claims_fail() {
    let s = issuer("secret");
    let token = s.issue(&student()).unwrap();
    let parts: Vec<&str> = token.split('.').collect();

    let mut claims: Claims = serde_json::from_slice(&B64.decode(parts[1]).unwrap()).unwrap();
    claims.kind = PrincipalKind::Registrar;
    let forged = format!(
      "{}.{}.{}",
      parts[0],
      B64.encode(serde_json::to_vec(&claims).unwrap()),
      parts[2]
    );
    assert!(matches!(s.verify(&forged), Err(SessionError::Signature)));
  }

  #[test]
  fn malformed_tokens_fail() {
    let s = issuer("secret");
    for bad in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
      assert!(
        matches!(s.verify(bad), Err(SessionError::Malformed)),
        "accepted {bad:?}"
      );
    }
  }

  #[test]
  fn unsigned_algorithm_is_rejected() {
    let s = issuer("secret");
    let token = s.issue(&student()).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    let none_header = B64.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let forged = format!("{none_header}.{}.", parts[1]);
    assert!(s.verify(&forged).is_err());
  }
}
